//! Common error types for the domain crate.

/// Errors produced while interpreting script text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// A condition string contained none of the known comparison operators.
    #[error("no comparison operator in `{0}`")]
    MissingOperator(String),
    /// An operator token was not part of the known vocabulary.
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
}
