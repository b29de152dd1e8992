//! Process mailbox.
//!
//! Each process owns exactly one mailbox. Messages arrive on an unbounded
//! MPSC channel; a save area in front of the channel holds messages that a
//! selective receive has already scanned and declined, so that arrival
//! order is never altered and a declined message can still match a later
//! receive.

use crate::selector::Selector;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use wisp_core::RawTerm;

/// The receiving end of a process mailbox.
///
/// Held by the owning process; never shared.
pub struct Mailbox {
    rx: mpsc::UnboundedReceiver<RawTerm>,
    /// Messages scanned and declined by a selective receive, in arrival
    /// order, ahead of anything still in the channel.
    saved: VecDeque<RawTerm>,
}

impl Mailbox {
    /// Creates a new mailbox, returning the mailbox and its sender.
    pub fn new() -> (Self, MailboxSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx,
                saved: VecDeque::new(),
            },
            MailboxSender { tx },
        )
    }

    /// Receives the next message in arrival order, waiting until one is
    /// available.
    ///
    /// Returns `None` if all senders have been dropped and the queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<RawTerm> {
        if let Some(msg) = self.saved.pop_front() {
            return Some(msg);
        }
        self.rx.recv().await
    }

    /// Receives the next message with a timeout.
    ///
    /// Returns `Ok(Some(msg))` on delivery, `Ok(None)` if the mailbox is
    /// closed, or `Err(())` if the timeout elapsed first.
    pub async fn recv_timeout(&mut self, duration: Duration) -> Result<Option<RawTerm>, ()> {
        if let Some(msg) = self.saved.pop_front() {
            return Ok(Some(msg));
        }
        match timeout(duration, self.rx.recv()).await {
            Ok(msg) => Ok(msg),
            Err(_) => Err(()),
        }
    }

    /// Tries to receive a message without waiting.
    pub fn try_recv(&mut self) -> Option<RawTerm> {
        if let Some(msg) = self.saved.pop_front() {
            return Some(msg);
        }
        self.rx.try_recv().ok()
    }

    /// Selective receive.
    ///
    /// Scans queued messages head to tail, trying the selector's arms in
    /// declared order against each; the first message any arm accepts is
    /// removed and its handler's value returned. If nothing queued matches,
    /// waits for new arrivals, stashing the ones that do not match. With a
    /// timeout arm, the timeout handler runs exactly once if the deadline
    /// elapses before a match; the deadline and a matching arrival race and
    /// only the winner fires.
    ///
    /// Returns `None` only if the mailbox is closed before a match or
    /// timeout.
    pub async fn select<R>(&mut self, mut selector: Selector<R>) -> Option<R> {
        if let Some(result) = scan_saved(&mut self.saved, &mut selector) {
            return Some(result);
        }

        match selector.take_after() {
            None => loop {
                let msg = self.rx.recv().await?;
                match selector.try_message(&msg) {
                    Some(result) => return Some(result),
                    None => self.saved.push_back(msg),
                }
            },
            Some((duration, on_timeout)) => {
                let deadline = Instant::now() + duration;
                loop {
                    match timeout_at(deadline, self.rx.recv()).await {
                        Ok(Some(msg)) => match selector.try_message(&msg) {
                            Some(result) => return Some(result),
                            None => self.saved.push_back(msg),
                        },
                        Ok(None) => return None,
                        Err(_) => return Some(on_timeout()),
                    }
                }
            }
        }
    }

    /// Closes the mailbox, preventing any further sends.
    pub fn close(&mut self) {
        self.rx.close()
    }

    /// Number of messages currently queued in the save area.
    #[cfg(test)]
    pub(crate) fn saved_len(&self) -> usize {
        self.saved.len()
    }
}

/// Scans the save area in arrival order; the first message any arm accepts
/// is removed, preserving the relative order of the remainder.
fn scan_saved<R>(saved: &mut VecDeque<RawTerm>, selector: &mut Selector<R>) -> Option<R> {
    for i in 0..saved.len() {
        if let Some(result) = selector.try_message(&saved[i]) {
            saved.remove(i);
            return Some(result);
        }
    }
    None
}

/// The sending end of a process mailbox.
///
/// Cloneable; one clone per handle referencing the owning process.
#[derive(Clone)]
pub struct MailboxSender {
    tx: mpsc::UnboundedSender<RawTerm>,
}

impl MailboxSender {
    /// Enqueues a message at the tail of the mailbox.
    ///
    /// Returns `Err` with the message if the mailbox is closed.
    pub fn send(&self, msg: RawTerm) -> Result<(), RawTerm> {
        self.tx.send(msg).map_err(|e| e.0)
    }

    /// Returns `true` if the mailbox is closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
