//! Serializer — script IR to DSL text.
//!
//! Output is canonical rather than a byte-for-byte inverse of hand-written
//! input: per container, every bare command value lands in one leading
//! `@commands` block (or one run of `then`/`else` lines), followed by one
//! block per timer/conditional in order. Four spaces per nesting level.
//! [`crate::parse::parse`] reproduces any tree serialized here.

use crate::script::{Action, Script, TriggerBlock};

const INDENT: &str = "    ";

/// Render a [`Script`] as DSL text.
#[must_use]
pub fn serialize(script: &Script) -> String {
    let mut out = String::new();
    for trigger in &script.triggers {
        write_trigger(&mut out, trigger);
    }
    out
}

fn write_trigger(out: &mut String, trigger: &TriggerBlock) {
    push_line(out, 0, &format!("@trigger {}", trigger.event));

    let values: Vec<&String> = trigger
        .actions
        .iter()
        .filter_map(|action| match action {
            Action::Command { values } => Some(values),
            _ => None,
        })
        .flatten()
        .collect();
    if !values.is_empty() {
        push_line(out, 1, "@commands");
        for value in values {
            push_line(out, 2, value);
        }
    }

    for action in &trigger.actions {
        write_block(out, action, 1);
    }
}

fn write_block(out: &mut String, action: &Action, depth: usize) {
    match action {
        // Command values are emitted by the enclosing container.
        Action::Command { .. } => {}
        Action::Timer {
            name,
            duration,
            tick,
            commands,
        } => {
            // Always the explicit form: a numeric name stays unambiguous.
            push_line(out, depth, &format!("@timer {duration} {tick} {name}"));
            for command in commands {
                push_line(out, depth + 1, command);
            }
        }
        Action::IfThenElse {
            condition,
            then,
            otherwise,
        } => {
            push_line(out, depth, &format!("@if {condition}"));
            write_branch(out, "then", then, depth + 1);
            write_branch(out, "else", otherwise, depth + 1);
        }
    }
}

fn write_branch(out: &mut String, keyword: &str, actions: &[Action], depth: usize) {
    for action in actions {
        if let Action::Command { values } = action {
            for value in values {
                push_line(out, depth, &format!("{keyword} {value}"));
            }
        }
    }

    if actions
        .iter()
        .any(|action| !matches!(action, Action::Command { .. }))
    {
        push_line(out, depth, keyword);
        for action in actions {
            write_block(out, action, depth + 1);
        }
    }
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::script::{Condition, Operator};

    fn command(values: &[&str]) -> Action {
        Action::Command {
            values: values.iter().map(ToString::to_string).collect(),
        }
    }

    fn timer(name: &str, duration: u64, tick: u64, commands: &[&str]) -> Action {
        Action::Timer {
            name: name.to_string(),
            duration,
            tick,
            commands: commands.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn should_emit_commands_block_then_one_block_per_action() {
        let script = Script::new(vec![TriggerBlock::builder()
            .event("PlayerJoined")
            .action(command(&["/chat Hi", "/give sword 1"]))
            .action(Action::IfThenElse {
                condition: Condition::new("player.health", Operator::Eq, "100"),
                then: vec![command(&["/chat full"])],
                otherwise: vec![],
            })
            .action(timer("Timer", 5000, 1, &["/chat tick"]))
            .build()]);

        let text = serialize(&script);
        assert_eq!(
            text,
            "\
@trigger PlayerJoined
    @commands
        /chat Hi
        /give sword 1
    @if player.health == 100
        then /chat full
    @timer 5000 1 Timer
        /chat tick
"
        );
    }

    #[test]
    fn should_roundtrip_canonical_trees_up_to_depth_three() {
        let deep = Action::IfThenElse {
            condition: Condition::new("depth", Operator::Gt, "2"),
            then: vec![command(&["/deepest"])],
            otherwise: vec![],
        };
        let middle = Action::IfThenElse {
            condition: Condition::new("depth", Operator::Ge, "1"),
            then: vec![command(&["/mid"]), deep],
            otherwise: vec![timer("Retry", 250, 5, &["/again"])],
        };
        let script = Script::new(vec![TriggerBlock::builder()
            .event("PlayerDied")
            .action(command(&["/chat oh no"]))
            .action(middle)
            .action(timer("Respawn", 3000, 1, &[]))
            .build()]);

        assert_eq!(parse(&serialize(&script)), script);
    }

    #[test]
    fn should_roundtrip_conditional_with_both_branches_nested() {
        let script = Script::new(vec![TriggerBlock::builder()
            .event("E")
            .action(Action::IfThenElse {
                condition: Condition::new("a", Operator::Ne, "b"),
                then: vec![
                    command(&["/t1", "/t2"]),
                    Action::IfThenElse {
                        condition: Condition::new("c", Operator::Matches, "d.*"),
                        then: vec![],
                        otherwise: vec![command(&["/fallback"])],
                    },
                ],
                otherwise: vec![command(&["/e1"]), timer("T", 10, 1, &["/tt"])],
            })
            .build()]);

        assert_eq!(parse(&serialize(&script)), script);
    }

    #[test]
    fn should_serialize_idempotently_for_non_canonical_trees() {
        // Commands after a timer get hoisted into the leading @commands
        // block; a second pass must not move anything further.
        let script = Script::new(vec![TriggerBlock::builder()
            .event("E")
            .action(timer("T", 100, 1, &[]))
            .action(command(&["/late"]))
            .build()]);

        let once = serialize(&script);
        let twice = serialize(&parse(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn should_emit_branch_commands_as_keyword_lines() {
        let script = Script::new(vec![TriggerBlock::builder()
            .event("E")
            .action(Action::IfThenElse {
                condition: Condition::new("x", Operator::Lt, "5"),
                then: vec![command(&["/a"])],
                otherwise: vec![command(&["/b"])],
            })
            .build()]);

        let text = serialize(&script);
        assert_eq!(
            text,
            "\
@trigger E
    @if x < 5
        then /a
        else /b
"
        );
    }

    #[test]
    fn should_emit_bare_marker_before_nested_blocks() {
        let script = Script::new(vec![TriggerBlock::builder()
            .event("E")
            .action(Action::IfThenElse {
                condition: Condition::new("x", Operator::Eq, "y"),
                then: vec![timer("Inner", 50, 1, &[])],
                otherwise: vec![],
            })
            .build()]);

        let text = serialize(&script);
        assert_eq!(
            text,
            "\
@trigger E
    @if x == y
        then
            @timer 50 1 Inner
"
        );
    }

    #[test]
    fn should_keep_numeric_timer_names_unambiguous() {
        let script = Script::new(vec![TriggerBlock::builder()
            .event("E")
            .action(timer("2", 500, 1, &[]))
            .build()]);

        assert_eq!(parse(&serialize(&script)), script);
    }

    #[test]
    fn should_serialize_empty_script_to_empty_text() {
        assert_eq!(serialize(&Script::default()), "");
    }

    #[test]
    fn should_serialize_trigger_without_actions_as_single_line() {
        let script = Script::new(vec![TriggerBlock::builder().event("Lonely").build()]);
        assert_eq!(serialize(&script), "@trigger Lonely\n");
        assert_eq!(parse(&serialize(&script)), script);
    }
}
