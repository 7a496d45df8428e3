use std::fmt;

use super::BatchState;

/// A batch lifecycle call made in the wrong state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BatchError {
    /// `draw` or `end` outside a `begin`/`end` pair.
    NotBatching { op: &'static str, state: BatchState },
    /// The batch was read before `end` finalized it.
    NotFinalized { op: &'static str, state: BatchState },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBatching { op, state } => {
                write!(f, "`{op}` requires an open batch (call `begin` first), batch is {state:?}")
            }
            Self::NotFinalized { op, state } => {
                write!(
                    f,
                    "`{op}` requires a finalized batch (call `end` first), batch is {state:?}"
                )
            }
        }
    }
}

impl std::error::Error for BatchError {}
