//! Tasks: processes that compute a single value.
//!
//! A [`Task`] wraps a process spawned to produce one result. The owner
//! joins it to retrieve the value; a task that exits abnormally (panic or
//! crash) surfaces its exit reason as a [`JoinError`] instead of taking
//! the owner down.
//!
//! ```ignore
//! let task = task::spawn(|| async { 6 * 7 });
//! let answer: u32 = task.join().await?;
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use wisp_core::{DecodeError, ExitReason, Pid, Ref, SystemMessage, Term};
use wisp_runtime::Selector;

/// A handle to a process computing a single value.
///
/// Created by [`spawn`]. Must be joined from the process that spawned it;
/// the completion signal is delivered to that process's mailbox.
pub struct Task<T> {
    pid: Pid,
    monitor_ref: Ref,
    cell: Arc<OnceLock<Vec<u8>>>,
    outcome: Option<ExitReason>,
    _marker: PhantomData<fn() -> T>,
}

/// Error returned when joining a task that did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// The task exited before producing a value.
    #[error("task {pid} exited: {reason}")]
    Exited {
        /// The task's pid.
        pid: Pid,
        /// Why it exited.
        reason: ExitReason,
    },
    /// The stored result could not be decoded as the expected type.
    #[error("failed to decode task result: {0}")]
    Decode(#[from] DecodeError),
    /// The owner's mailbox closed while waiting.
    #[error("mailbox closed while joining task")]
    MailboxClosed,
}

/// Spawns a process computing a single value and returns its [`Task`].
///
/// The calling process monitors the new process; exactly one completion
/// signal will reach the caller's mailbox, where [`Task::join`] picks it
/// out selectively without disturbing other messages.
///
/// # Panics
///
/// Panics if the global runtime has not been initialized or if called
/// outside of a process context.
pub fn spawn<T, F, Fut>(f: F) -> Task<T>
where
    T: Term,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let cell = Arc::new(OnceLock::new());
    let cell_for_body = cell.clone();

    let (pid, monitor_ref) = crate::global::spawn_monitor(move || async move {
        let value = f().await;
        // The write happens before the process exits, so a Normal Down
        // always finds the cell populated.
        let _ = cell_for_body.set(value.encode());
    });

    Task {
        pid,
        monitor_ref,
        cell,
        outcome: None,
        _marker: PhantomData,
    }
}

/// Joins every task in order, returning results in the same order
/// regardless of which task finished first.
pub async fn join_all<T: Term>(tasks: Vec<Task<T>>) -> Vec<Result<T, JoinError>> {
    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(task.join().await);
    }
    results
}

impl<T: Term> Task<T> {
    /// The pid of the task's process.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The monitor reference tying the completion signal to this task.
    pub fn monitor_ref(&self) -> Ref {
        self.monitor_ref
    }

    /// Waits for the task to finish and returns its value.
    ///
    /// Only the completion signal for this task is consumed from the
    /// caller's mailbox; everything else stays put.
    pub async fn join(mut self) -> Result<T, JoinError> {
        let reason = match self.outcome.take() {
            Some(reason) => reason,
            None => wisp_runtime::receive(self.down_selector())
                .await
                .ok_or(JoinError::MailboxClosed)?,
        };
        self.completed(reason)
    }

    /// Waits up to `timeout` for the task to finish.
    ///
    /// Returns `None` on timeout; the task keeps running and can be
    /// joined or polled again later.
    pub async fn poll_join(&mut self, timeout: Duration) -> Option<Result<T, JoinError>> {
        if let Some(reason) = self.outcome.clone() {
            return Some(self.completed(reason));
        }

        let reference = self.monitor_ref;
        let selector = Selector::new()
            .raw(move |raw| match raw.decode::<SystemMessage>() {
                Some(SystemMessage::Down {
                    monitor_ref,
                    reason,
                    ..
                }) if monitor_ref == reference => Some(Some(reason)),
                _ => None,
            })
            .after(timeout, || None);
        match wisp_runtime::receive(selector).await {
            None => Some(Err(JoinError::MailboxClosed)),
            Some(None) => None,
            Some(Some(reason)) => {
                self.outcome = Some(reason.clone());
                Some(self.completed(reason))
            }
        }
    }

    fn down_selector(&self) -> Selector<ExitReason> {
        let reference = self.monitor_ref;
        Selector::new().raw(move |raw| match raw.decode::<SystemMessage>() {
            Some(SystemMessage::Down {
                monitor_ref,
                reason,
                ..
            }) if monitor_ref == reference => Some(reason),
            _ => None,
        })
    }

    fn completed(&self, reason: ExitReason) -> Result<T, JoinError> {
        if reason.is_abnormal() {
            return Err(JoinError::Exited {
                pid: self.pid,
                reason,
            });
        }
        match self.cell.get() {
            Some(bytes) => Ok(T::decode(bytes)?),
            None => Err(JoinError::Exited {
                pid: self.pid,
                reason: ExitReason::error("task produced no result"),
            }),
        }
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("pid", &self.pid)
            .field("monitor_ref", &self.monitor_ref)
            .finish()
    }
}
