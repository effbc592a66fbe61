use serde::{Deserialize, Serialize};

/// Execution state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Never started, or reset.
    #[default]
    Uninitialized,
    /// Polled by every sweep until it resolves.
    Running,
    /// Suspended; only an awaken moves it on.
    Waiting,
    Success,
    Failure,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    pub fn is_failure(self) -> bool {
        self == Status::Failure
    }

    /// Success or Failure.
    pub fn is_completed(self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }

    /// Running or Waiting: started and not yet resolved.
    pub fn is_pending(self) -> bool {
        matches!(self, Status::Running | Status::Waiting)
    }

    /// Swaps Success and Failure; other states are returned as-is.
    pub fn invert(self) -> Status {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            other => other,
        }
    }

    /// Numeric form used in trace events.
    pub fn code(self) -> u64 {
        match self {
            Status::Uninitialized => 0,
            Status::Running => 1,
            Status::Waiting => 2,
            Status::Success => 3,
            Status::Failure => 4,
        }
    }
}
