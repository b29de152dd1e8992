//! Process exit reasons.
//!
//! An [`ExitReason`] describes why a process terminated. It travels inside
//! exit signals and monitor `Down` messages, and decides whether a link
//! cascade fires.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The reason a process exited.
///
/// - [`ExitReason::Normal`] means the process body completed. Normal exits
///   never forcibly terminate linked peers; they are at most delivered as
///   ordinary `Exit` messages.
/// - [`ExitReason::Error`] means the body failed (an uncaught panic, or a
///   cascaded failure from a linked peer). Abnormal exits propagate through
///   links to peers that are not trapping exits.
///
/// # Examples
///
/// ```
/// use wisp_core::ExitReason;
///
/// assert!(ExitReason::Normal.is_normal());
/// assert!(ExitReason::error("connection lost").is_abnormal());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExitReason {
    /// The process body completed without failure.
    #[default]
    Normal,

    /// The process terminated due to a failure.
    ///
    /// Carries a description of the failure, e.g. the panic message.
    Error(String),
}

impl ExitReason {
    /// Returns `true` if this is the distinguished normal reason.
    #[inline]
    pub fn is_normal(&self) -> bool {
        matches!(self, ExitReason::Normal)
    }

    /// Returns `true` if this is an abnormal exit reason.
    #[inline]
    pub fn is_abnormal(&self) -> bool {
        !self.is_normal()
    }

    /// Creates an abnormal exit reason from any displayable value.
    pub fn error(msg: impl fmt::Display) -> Self {
        ExitReason::Error(msg.to_string())
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Normal => write!(f, "normal"),
            ExitReason::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl From<&str> for ExitReason {
    fn from(s: &str) -> Self {
        ExitReason::Error(s.to_string())
    }
}

impl From<String> for ExitReason {
    fn from(s: String) -> Self {
        ExitReason::Error(s)
    }
}
