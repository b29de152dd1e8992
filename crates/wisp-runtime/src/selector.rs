//! Ordered pattern list for selective receive.
//!
//! A [`Selector`] is the explicit rendering of pattern-based receive: an
//! ordered list of arms, each a decode attempt (optionally guarded) paired
//! with a handler, plus an optional timeout arm. A mailbox tries the arms
//! in declared order against each queued message in arrival order; the
//! first message any arm accepts is consumed.

use std::time::Duration;
use wisp_core::{RawTerm, Term};

/// A single receive arm: tests a message, and on acceptance produces the
/// receive result. Returning `None` declines the message.
type Arm<R> = Box<dyn FnMut(&RawTerm) -> Option<R> + Send>;

/// An ordered set of receive patterns.
///
/// Arms are tried in the order they were added. The handler of the first
/// arm that accepts a message runs with the decoded value; messages no arm
/// accepts stay in the mailbox, in order.
///
/// # Examples
///
/// ```ignore
/// let result = wisp::receive(
///     Selector::new()
///         .matching(|Count(n)| n)
///         .after(Duration::from_millis(100), || 0),
/// )
/// .await;
/// ```
pub struct Selector<R> {
    arms: Vec<Arm<R>>,
    after: Option<(Duration, Box<dyn FnOnce() -> R + Send>)>,
}

impl<R> Selector<R> {
    /// Creates an empty selector.
    pub fn new() -> Self {
        Self {
            arms: Vec::new(),
            after: None,
        }
    }

    /// Adds an arm that accepts any message decoding as `M`.
    pub fn matching<M, F>(mut self, mut f: F) -> Self
    where
        M: Term,
        F: FnMut(M) -> R + Send + 'static,
    {
        self.arms
            .push(Box::new(move |raw| M::decode(raw.as_bytes()).ok().map(&mut f)));
        self
    }

    /// Adds an arm that accepts a message decoding as `M` only when the
    /// guard holds.
    pub fn matching_when<M, P, F>(mut self, pred: P, mut f: F) -> Self
    where
        M: Term,
        P: Fn(&M) -> bool + Send + 'static,
        F: FnMut(M) -> R + Send + 'static,
    {
        self.arms.push(Box::new(move |raw| {
            match M::decode(raw.as_bytes()) {
                Ok(m) if pred(&m) => Some(f(m)),
                _ => None,
            }
        }));
        self
    }

    /// Adds an arm that inspects the raw payload directly.
    ///
    /// Useful when one arm wants to try several decodings, or to match on
    /// a field (e.g. a monitor reference) before accepting.
    pub fn raw<F>(mut self, f: F) -> Self
    where
        F: FnMut(&RawTerm) -> Option<R> + Send + 'static,
    {
        self.arms.push(Box::new(f));
        self
    }

    /// Sets the timeout arm.
    ///
    /// If no queued or arriving message is accepted within `duration`, the
    /// handler runs exactly once, as if it had been a message. The deadline
    /// and a matching arrival race; whichever occurs first wins.
    pub fn after<F>(mut self, duration: Duration, f: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
    {
        self.after = Some((duration, Box::new(f)));
        self
    }

    /// Tries every arm, in declared order, against one message.
    pub(crate) fn try_message(&mut self, raw: &RawTerm) -> Option<R> {
        self.arms.iter_mut().find_map(|arm| arm(raw))
    }

    /// Takes the timeout arm, if any.
    pub(crate) fn take_after(&mut self) -> Option<(Duration, Box<dyn FnOnce() -> R + Send>)> {
        self.after.take()
    }
}

impl<R> Default for Selector<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for Selector<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("arms", &self.arms.len())
            .field("after", &self.after.as_ref().map(|(d, _)| *d))
            .finish()
    }
}
