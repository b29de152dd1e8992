//! Exit and Down signal payloads.
//!
//! When a process exits, its linked peers and monitors are notified through
//! ordinary mailbox messages of this type. They are terms like any other
//! message and are consumed with the same selective receive machinery.

use crate::{ExitReason, Pid, Ref};
use serde::{Deserialize, Serialize};

/// A signal delivered to a mailbox by the exit protocol.
///
/// - `Exit` is delivered to linked peers: always when the peer traps exits,
///   and also for normal-reason exits of a linked process.
/// - `Down` is delivered exactly once per monitor when the monitored
///   process exits, for any reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemMessage {
    /// A linked process exited.
    Exit {
        /// The process that exited.
        from: Pid,
        /// Why it exited.
        reason: ExitReason,
    },

    /// A monitored process exited.
    Down {
        /// The reference returned by `monitor`.
        monitor_ref: Ref,
        /// The process that exited.
        pid: Pid,
        /// Why it exited.
        reason: ExitReason,
    },
}

impl SystemMessage {
    /// Builds an `Exit` signal.
    pub fn exit(from: Pid, reason: ExitReason) -> Self {
        SystemMessage::Exit { from, reason }
    }

    /// Builds a `Down` signal.
    pub fn down(monitor_ref: Ref, pid: Pid, reason: ExitReason) -> Self {
        SystemMessage::Down {
            monitor_ref,
            pid,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Term;

    #[test]
    fn test_exit_roundtrip() {
        let msg = SystemMessage::exit(Pid::from_raw(1), ExitReason::error("boom"));
        let decoded = SystemMessage::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_down_roundtrip() {
        let msg = SystemMessage::down(Ref::from_raw(4), Pid::from_raw(2), ExitReason::Normal);
        let decoded = SystemMessage::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }
}
