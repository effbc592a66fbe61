use thiserror::Error;

use crate::ValueType;

/// Failures of the blackboard access contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlackboardError {
    #[error("unknown blackboard variable `{0}`")]
    UnknownVariable(String),

    #[error("duplicate blackboard variable guid {0}")]
    DuplicateVariable(crate::Guid),

    #[error("unknown listener {0}")]
    UnknownListener(u64),

    #[error("unknown blackboard {0}")]
    UnknownBoard(u16),

    #[error("variable `{variable}` holds {expected} values, got {found}")]
    TypeMismatch {
        variable: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("storage lock of variable `{0}` was poisoned")]
    LockPoisoned(String),

    #[error("shared variable `{0}` cannot be overridden")]
    SharedOverride(String),
}

pub type Result<T> = std::result::Result<T, BlackboardError>;
