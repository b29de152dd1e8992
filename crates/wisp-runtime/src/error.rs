//! Runtime error types.

use thiserror::Error;
use wisp_core::Pid;

/// Error returned by name registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// The name already maps to a currently-alive process.
    #[error("name {0:?} is already registered")]
    NameTaken(String),

    /// The process to register is not alive.
    ///
    /// Registering a dead pid would let `whereis` hand out a dead
    /// identity, so it is rejected.
    #[error("process {0} is not alive")]
    NoProcess(Pid),
}
