//! Process identifier type.
//!
//! A [`Pid`] uniquely identifies a process within a runtime instance.
//! Identifiers are issued monotonically from a global counter and are never
//! reused: the `Pid` of an exited process remains a valid, comparable token
//! that simply refers to nothing alive anymore.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for issuing unique process identifiers.
static PID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A process identifier.
///
/// Every process has a unique `Pid` that can be used to send messages,
/// establish links, create monitors, and query liveness. Sending to the
/// `Pid` of an exited process is a silent no-op, never an error.
///
/// # Examples
///
/// ```
/// use wisp_core::Pid;
///
/// let a = Pid::new();
/// let b = Pid::new();
/// assert_ne!(a, b);
/// println!("{a}"); // e.g. "<0.42>"
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(u64);

impl Pid {
    /// Issues a new unique process identifier.
    pub fn new() -> Self {
        Self(PID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Builds a `Pid` from a raw value.
    ///
    /// Primarily useful in tests; in normal usage pids come from spawning.
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[inline]
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl Default for Pid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid<0.{}>", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0.{}>", self.0)
    }
}
