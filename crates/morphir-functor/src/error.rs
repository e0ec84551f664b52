//! Error types for contract checking and functor application
//!
//! Every error here is raised when a contract is defined, a module is sealed
//! or a functor is applied. None of them is deferred to later member access.

use crate::identity::TypeTag;
use crate::naming::Name;
use crate::registry::ContractId;
use std::fmt;
use thiserror::Error;

/// Result type alias for functor operations
pub type Result<T> = std::result::Result<T, FunctorError>;

/// Which side of a functor application broke its contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The argument module did not satisfy the parameter contract.
    Input,
    /// The body produced a module that does not satisfy the declared result.
    Output,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Input => f.write_str("argument"),
            Side::Output => f.write_str("result"),
        }
    }
}

/// Main error type for contracts, modules and generators
#[derive(Error, Debug)]
pub enum FunctorError {
    #[error("missing member `{member}`")]
    MissingMember { member: Name },

    #[error("type mismatch for `{member}`: expected {expected}, found {actual}")]
    TypeMismatch {
        member: Name,
        expected: String,
        actual: String,
    },

    #[error("{generator}: {side} does not satisfy its contract")]
    ContractViolation {
        generator: Name,
        side: Side,
        #[source]
        source: Box<FunctorError>,
    },

    #[error("ambiguous member `{member}`")]
    AmbiguousMember { member: Name },

    #[error("type identity mismatch: expected {expected}, found {actual}")]
    TypeIdentityMismatch { expected: TypeTag, actual: TypeTag },

    #[error("unbound type `{name}`")]
    UnboundType { name: Name },

    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    #[error("`{operation}` expects {expected} argument(s), got {actual}")]
    Arity {
        operation: Name,
        expected: usize,
        actual: usize,
    },

    #[error("no contract registered as {id}")]
    UnknownContract { id: ContractId },

    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

impl FunctorError {
    pub fn missing(member: Name) -> Self {
        FunctorError::MissingMember { member }
    }

    pub fn mismatch(member: Name, expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        FunctorError::TypeMismatch {
            member,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Follow `ContractViolation` wrappers down to the member-level error.
    pub fn root_cause(&self) -> &FunctorError {
        match self {
            FunctorError::ContractViolation { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The member an error is about, if it names one.
    pub fn member(&self) -> Option<Name> {
        match self.root_cause() {
            FunctorError::MissingMember { member }
            | FunctorError::TypeMismatch { member, .. }
            | FunctorError::AmbiguousMember { member } => Some(*member),
            FunctorError::UnboundType { name } => Some(*name),
            FunctorError::Arity { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_violation() {
        let err = FunctorError::ContractViolation {
            generator: Name::new("MakeInterval"),
            side: Side::Input,
            source: Box::new(FunctorError::missing(Name::new("compare"))),
        };
        assert!(matches!(
            err.root_cause(),
            FunctorError::MissingMember { .. }
        ));
        assert_eq!(err.member(), Some(Name::new("compare")));
        assert_eq!(
            err.to_string(),
            "MakeInterval: argument does not satisfy its contract"
        );
    }
}
