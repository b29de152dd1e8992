//! Unique reference type.
//!
//! A [`Ref`] is a unique token used to tie a monitor to its single `Down`
//! signal and a task to its reply. References are only ever equal to
//! themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for issuing unique references.
static REF_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A unique reference.
///
/// # Examples
///
/// ```
/// use wisp_core::Ref;
///
/// let r1 = Ref::new();
/// let r2 = Ref::new();
/// assert_ne!(r1, r2);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref(u64);

impl Ref {
    /// Issues a new unique reference.
    pub fn new() -> Self {
        Self(REF_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Builds a `Ref` from a raw value. Primarily useful in tests.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value of this reference.
    #[inline]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl Default for Ref {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({})", self.0)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
