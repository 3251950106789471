//! Condition — a left/operator/right comparison guarding a conditional.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;

/// Comparison operator vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=~")]
    Matches,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl Operator {
    /// Every operator, two-character symbols first.
    ///
    /// Scanning in this order keeps `>=` from being misread as `>` with a
    /// leftover `=` in the right operand.
    pub const ALL: [Self; 7] = [
        Self::Eq,
        Self::Ne,
        Self::Ge,
        Self::Le,
        Self::Matches,
        Self::Gt,
        Self::Lt,
    ];

    /// The operator's surface symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Matches => "=~",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or_else(|| ScriptError::UnknownOperator(s.to_string()))
    }
}

/// A single comparison: `left <operator> right`.
///
/// Operands are opaque strings; the external surface decides what they mean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub left: String,
    pub operator: Operator,
    pub right: String,
}

impl Condition {
    /// Build a condition from already-split parts.
    #[must_use]
    pub fn new(left: impl Into<String>, operator: Operator, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            operator,
            right: right.into(),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

impl FromStr for Condition {
    type Err = ScriptError;

    /// Decompose `"left op right"` by scanning for operators in
    /// length-descending order ([`Operator::ALL`]), first match wins.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for op in Operator::ALL {
            if let Some(idx) = s.find(op.symbol()) {
                let left = s[..idx].trim();
                let right = s[idx + op.symbol().len()..].trim();
                return Ok(Self::new(left, op, right));
            }
        }
        Err(ScriptError::MissingOperator(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decompose_two_character_operator_before_its_prefix() {
        let cond: Condition = "a >= b".parse().unwrap();
        assert_eq!(cond.left, "a");
        assert_eq!(cond.operator, Operator::Ge);
        assert_eq!(cond.right, "b");
    }

    #[test]
    fn should_decompose_every_operator_symbol() {
        for op in Operator::ALL {
            let text = format!("player.health {} 100", op.symbol());
            let cond: Condition = text.parse().unwrap();
            assert_eq!(cond.operator, op, "operator {op} mis-decomposed");
            assert_eq!(cond.left, "player.health");
            assert_eq!(cond.right, "100");
        }
    }

    #[test]
    fn should_decompose_unspaced_condition() {
        let cond: Condition = "hp<=20".parse().unwrap();
        assert_eq!(cond.left, "hp");
        assert_eq!(cond.operator, Operator::Le);
        assert_eq!(cond.right, "20");
    }

    #[test]
    fn should_return_error_when_no_operator_present() {
        let result: Result<Condition, _> = "just words".parse();
        assert!(matches!(result, Err(ScriptError::MissingOperator(_))));
    }

    #[test]
    fn should_keep_extra_operator_characters_in_right_operand() {
        // `==` wins over the later `>`; the right operand keeps it verbatim.
        let cond: Condition = "a == b > c".parse().unwrap();
        assert_eq!(cond.operator, Operator::Eq);
        assert_eq!(cond.right, "b > c");
    }

    #[test]
    fn should_roundtrip_operator_through_display_and_from_str() {
        for op in Operator::ALL {
            let parsed: Operator = op.symbol().parse().unwrap();
            assert_eq!(parsed, op);
        }
    }

    #[test]
    fn should_return_error_when_parsing_unknown_operator() {
        let result: Result<Operator, _> = "<>".parse();
        assert!(matches!(result, Err(ScriptError::UnknownOperator(_))));
    }

    #[test]
    fn should_serialize_operator_as_its_symbol() {
        let json = serde_json::to_string(&Operator::Ge).unwrap();
        assert_eq!(json, "\">=\"");
        let parsed: Operator = serde_json::from_str("\"=~\"").unwrap();
        assert_eq!(parsed, Operator::Matches);
    }

    #[test]
    fn should_roundtrip_condition_through_serde_json() {
        let cond = Condition::new("player.health", Operator::Eq, "100");
        let json = serde_json::to_string(&cond).unwrap();
        let parsed: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cond);
    }

    #[test]
    fn should_display_condition_with_spaced_operator() {
        let cond = Condition::new("a", Operator::Lt, "b");
        assert_eq!(cond.to_string(), "a < b");
    }
}
