//! Action — one node of the trigger/action tree.

use serde::{Deserialize, Serialize};

use super::Condition;

fn default_timer_name() -> String {
    "Timer".to_string()
}

fn default_timer_tick() -> u64 {
    1
}

/// An operation executed when the owning trigger fires.
///
/// The array position of an action is its execution/display order; the
/// applier reproduces it as creation order on the external surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// A run of raw command lines. Each value is an opaque `/...` string.
    Command { values: Vec<String> },
    /// A named repeating timer with its own command lines.
    Timer {
        #[serde(default = "default_timer_name")]
        name: String,
        duration: u64,
        #[serde(default = "default_timer_tick")]
        tick: u64,
        /// Serialized as `values` on the wire.
        #[serde(default, rename = "values", skip_serializing_if = "Vec::is_empty")]
        commands: Vec<String>,
    },
    /// A two-branch conditional; branches nest arbitrarily.
    IfThenElse {
        condition: Condition,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        then: Vec<Action>,
        #[serde(default, rename = "else", skip_serializing_if = "Vec::is_empty")]
        otherwise: Vec<Action>,
    },
}

impl Action {
    /// Progress units this action contributes to an apply pass:
    /// one per action, plus type-specific extras — one per command value,
    /// three per timer (name/duration/tick), three per conditional
    /// (left/operator/right) plus the recursive totals of both branches.
    #[must_use]
    pub fn progress_units(&self) -> usize {
        match self {
            Self::Command { values } => 1 + values.len(),
            Self::Timer { .. } => 1 + 3,
            Self::IfThenElse {
                then, otherwise, ..
            } => {
                1 + 3
                    + then.iter().map(Self::progress_units).sum::<usize>()
                    + otherwise.iter().map(Self::progress_units).sum::<usize>()
            }
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command { values } => write!(f, "command({} values)", values.len()),
            Self::Timer { name, duration, .. } => write!(f, "timer({name}, {duration})"),
            Self::IfThenElse { condition, .. } => write!(f, "if({condition})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Operator;

    #[test]
    fn should_serialize_command_with_type_tag() {
        let action = Action::Command {
            values: vec!["/chat Hi".to_string()],
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "command");
        assert_eq!(json["values"][0], "/chat Hi");
    }

    #[test]
    fn should_serialize_timer_commands_under_the_values_key() {
        let action = Action::Timer {
            name: "Heartbeat".to_string(),
            duration: 5000,
            tick: 2,
            commands: vec!["/chat tick".to_string()],
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "timer");
        assert_eq!(json["values"][0], "/chat tick");
        assert!(json.get("commands").is_none());
    }

    #[test]
    fn should_omit_empty_timer_commands_from_json() {
        let action = Action::Timer {
            name: "Timer".to_string(),
            duration: 100,
            tick: 1,
            commands: vec![],
        };
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("values").is_none());
    }

    #[test]
    fn should_deserialize_timer_with_defaulted_name_and_tick() {
        let json = serde_json::json!({"type": "timer", "duration": 5000});
        let action: Action = serde_json::from_value(json).unwrap();
        match action {
            Action::Timer {
                name,
                duration,
                tick,
                commands,
            } => {
                assert_eq!(name, "Timer");
                assert_eq!(duration, 5000);
                assert_eq!(tick, 1);
                assert!(commands.is_empty());
            }
            other => panic!("expected timer, got {other}"),
        }
    }

    #[test]
    fn should_serialize_conditional_with_else_key() {
        let action = Action::IfThenElse {
            condition: Condition::new("a", Operator::Eq, "b"),
            then: vec![Action::Command {
                values: vec!["/x".to_string()],
            }],
            otherwise: vec![Action::Command {
                values: vec!["/y".to_string()],
            }],
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "ifthenelse");
        assert_eq!(json["condition"]["operator"], "==");
        assert_eq!(json["then"][0]["values"][0], "/x");
        assert_eq!(json["else"][0]["values"][0], "/y");
    }

    #[test]
    fn should_omit_empty_branches_from_json() {
        let action = Action::IfThenElse {
            condition: Condition::new("a", Operator::Eq, "b"),
            then: vec![],
            otherwise: vec![],
        };
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("then").is_none());
        assert!(json.get("else").is_none());
    }

    #[test]
    fn should_deserialize_conditional_with_missing_branches() {
        let json = serde_json::json!({
            "type": "ifthenelse",
            "condition": {"left": "a", "operator": "!=", "right": "b"}
        });
        let action: Action = serde_json::from_value(json).unwrap();
        match action {
            Action::IfThenElse {
                then, otherwise, ..
            } => {
                assert!(then.is_empty());
                assert!(otherwise.is_empty());
            }
            other => panic!("expected conditional, got {other}"),
        }
    }

    #[test]
    fn should_roundtrip_nested_actions_through_serde_json() {
        let action = Action::IfThenElse {
            condition: Condition::new("depth", Operator::Gt, "0"),
            then: vec![Action::IfThenElse {
                condition: Condition::new("depth", Operator::Gt, "1"),
                then: vec![Action::Timer {
                    name: "Inner".to_string(),
                    duration: 250,
                    tick: 5,
                    commands: vec!["/deep".to_string()],
                }],
                otherwise: vec![],
            }],
            otherwise: vec![],
        };
        let json = serde_json::to_string(&action).unwrap();
        let parsed: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, action);
    }

    #[test]
    fn should_count_command_units_per_value() {
        let action = Action::Command {
            values: vec!["/a".to_string(), "/b".to_string(), "/c".to_string()],
        };
        assert_eq!(action.progress_units(), 4);
    }

    #[test]
    fn should_count_timer_as_four_units_regardless_of_commands() {
        let action = Action::Timer {
            name: "T".to_string(),
            duration: 100,
            tick: 1,
            commands: vec!["/a".to_string(), "/b".to_string()],
        };
        assert_eq!(action.progress_units(), 4);
    }

    #[test]
    fn should_count_conditional_units_including_both_branches() {
        let action = Action::IfThenElse {
            condition: Condition::new("a", Operator::Eq, "b"),
            then: vec![Action::Command {
                values: vec!["/x".to_string()],
            }],
            otherwise: vec![Action::Timer {
                name: "T".to_string(),
                duration: 1,
                tick: 1,
                commands: vec![],
            }],
        };
        // 1 + 3 for the conditional, 2 for the then command, 4 for the timer
        assert_eq!(action.progress_units(), 10);
    }

    #[test]
    fn should_display_action_variants() {
        let cmd = Action::Command {
            values: vec!["/x".to_string()],
        };
        assert_eq!(cmd.to_string(), "command(1 values)");

        let timer = Action::Timer {
            name: "T".to_string(),
            duration: 42,
            tick: 1,
            commands: vec![],
        };
        assert_eq!(timer.to_string(), "timer(T, 42)");

        let cond = Action::IfThenElse {
            condition: Condition::new("a", Operator::Eq, "b"),
            then: vec![],
            otherwise: vec![],
        };
        assert_eq!(cond.to_string(), "if(a == b)");
    }
}
