//! Lowering errors
//!
//! The stage runs on already-validated input, so nearly every error here is
//! a broken internal invariant rather than a user diagnostic.

use thiserror::Error;

pub type LowerResult<T> = Result<T, LowerError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LowerError {
    /// A captured scope was read from a function that never received its alias
    #[error("No scope alias for scope {scope} in function {function}")]
    UnresolvedScopeAlias { scope: u32, function: String },

    /// The declaration graph is not a DAG
    #[error("Dependency cycle between declarations: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("Unknown class {0}")]
    UnknownClass(u32),

    #[error("Unknown function {0}")]
    UnknownFunction(u32),

    #[error("Unknown member {member} of class {class}")]
    UnknownMember { class: u32, member: String },

    /// A reference to a local that no enclosing scope declares
    #[error("Local {local} is not bound in any enclosing scope")]
    UnboundLocal { local: u32 },

    #[error("Invalid lowering options: {message}")]
    InvalidOptions { message: String },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}

impl LowerError {
    pub fn internal(message: impl Into<String>) -> Self {
        LowerError::InternalError {
            message: message.into(),
        }
    }

    /// Whether this error is a compiler bug rather than bad configuration.
    pub fn is_internal(&self) -> bool {
        !matches!(self, LowerError::InvalidOptions { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = LowerError::DependencyCycle(vec!["A$".into(), "B$".into(), "A$".into()]);
        assert_eq!(
            err.to_string(),
            "Dependency cycle between declarations: A$ -> B$ -> A$"
        );
        assert!(err.is_internal());
    }

    #[test]
    fn test_options_errors_are_not_internal() {
        let err = LowerError::InvalidOptions {
            message: "private_hash_len must be between 1 and 64".into(),
        };
        assert!(!err.is_internal());
    }
}
