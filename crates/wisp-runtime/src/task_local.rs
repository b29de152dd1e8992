//! Task-local context for Wisp processes.
//!
//! This module provides task-local storage for the process context,
//! allowing code inside a process body to reach its own mailbox and the
//! runtime services without explicit parameter passing.
//!
//! Mailbox operations lock the context; everything else routes through
//! the mailbox-free [`crate::ProcessServices`] half, so sends and
//! relation changes keep working while a receive is in progress,
//! including from inside a receive arm.

use crate::context::{Context, ProcessServices};
use crate::error::RegisterError;
use crate::selector::Selector;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use wisp_core::{ExitReason, Pid, RawTerm, Ref, Term};

/// Container for process context.
///
/// The services half is kept outside the lock so it stays reachable while
/// the mailbox is busy.
struct ProcessContext {
    pid: Pid,
    services: ProcessServices,
    /// The mailbox-bearing context (requires async lock for mutable
    /// access).
    ctx: Arc<Mutex<Context>>,
}

tokio::task_local! {
    /// Task-local storage for the current process context.
    static CONTEXT: ProcessContext;
}

/// Wrapper that sets up task-local context for a process.
///
/// The spawning layer wraps every process body in a scope so that the free
/// functions in this module (`current_pid()`, `recv()`, `send()`, ...) work
/// during execution.
pub struct ProcessScope {
    ctx: Context,
}

impl ProcessScope {
    /// Creates a new process scope with the given context.
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Runs the process body with task-local context available and returns
    /// how it finished.
    ///
    /// A body that returns yields [`ExitReason::Normal`]; a body that panics
    /// is caught and yields [`ExitReason::Error`] carrying the panic
    /// message.
    pub async fn run<F, Fut>(self, f: F) -> ExitReason
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        let pid = self.ctx.pid();
        let services = self.ctx.services();
        let process_ctx = ProcessContext {
            pid,
            services,
            ctx: Arc::new(Mutex::new(self.ctx)),
        };
        let outcome = CONTEXT
            .scope(process_ctx, AssertUnwindSafe(f()).catch_unwind())
            .await;
        match outcome {
            Ok(()) => ExitReason::Normal,
            Err(payload) => ExitReason::Error(panic_message(payload)),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic".to_string()
    }
}

/// Gets the current process's pid from task-local context.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn current_pid() -> Pid {
    CONTEXT.with(|ctx| ctx.pid)
}

/// Gets the current process's pid, returning `None` if not in a process
/// context.
pub fn try_current_pid() -> Option<Pid> {
    CONTEXT.try_with(|ctx| ctx.pid).ok()
}

/// Receives the next message from the current process's mailbox.
///
/// Returns `None` if the mailbox is closed.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub async fn recv() -> Option<RawTerm> {
    let ctx = CONTEXT.with(|c| c.ctx.clone());
    let mut guard = ctx.lock().await;
    guard.recv().await
}

/// Receives the next message with a timeout.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub async fn recv_timeout(timeout: Duration) -> Result<Option<RawTerm>, ()> {
    let ctx = CONTEXT.with(|c| c.ctx.clone());
    let mut guard = ctx.lock().await;
    guard.recv_timeout(timeout).await
}

/// Tries to receive a message without blocking.
///
/// Returns `None` when the mailbox is empty, and also while a receive on
/// this process is already in progress.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn try_recv() -> Option<RawTerm> {
    let ctx = CONTEXT.with(|c| c.ctx.clone());
    let lock = ctx.try_lock();
    match lock {
        Ok(mut guard) => guard.try_recv(),
        Err(_) => None,
    }
}

/// Selective receive over the current process's mailbox.
///
/// See [`crate::Mailbox::select`] for the matching and timeout semantics.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub async fn receive<R>(selector: Selector<R>) -> Option<R> {
    let ctx = CONTEXT.with(|c| c.ctx.clone());
    let mut guard = ctx.lock().await;
    guard.receive(selector).await
}

/// Sends a raw message to another process.
///
/// Sending never fails; messages to dead or unknown pids are dropped.
/// Usable anywhere in the process body, including inside a receive arm.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn send_raw(pid: Pid, data: Vec<u8>) {
    CONTEXT.with(|c| c.services.send_raw(pid, data));
}

/// Sends a typed message to another process.
///
/// The message is encoded (copied) at this call site; sending never fails,
/// messages to dead or unknown pids are dropped. Usable anywhere in the
/// process body, including inside a receive arm.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn send<M: Term>(pid: Pid, msg: &M) {
    CONTEXT.with(|c| c.services.send(pid, msg));
}

/// Sets the current process's trap-exit flag, returning the previous value.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn trap_exit(trap: bool) -> bool {
    CONTEXT.with(|c| c.services.set_trap_exit(trap))
}

/// Links the current process to `other`.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn link(other: Pid) {
    CONTEXT.with(|c| c.services.link(other));
}

/// Removes the link between the current process and `other`, if any.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn unlink(other: Pid) {
    CONTEXT.with(|c| c.services.unlink(other));
}

/// Starts monitoring `target` from the current process.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn monitor(target: Pid) -> Ref {
    CONTEXT.with(|c| c.services.monitor(target))
}

/// Removes a monitor held by the current process.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn demonitor(reference: Ref) {
    CONTEXT.with(|c| c.services.demonitor(reference));
}

/// Registers a name for the current process.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn register(name: impl Into<String>) -> Result<(), RegisterError> {
    CONTEXT.with(|c| c.services.register(name))
}

/// Removes a registered name.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn unregister(name: &str) -> Option<Pid> {
    CONTEXT.with(|c| c.services.unregister(name))
}

/// Looks up a registered name.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub fn whereis(name: &str) -> Option<Pid> {
    CONTEXT.with(|c| c.services.whereis(name))
}

/// Executes a function with mutable access to the current context.
///
/// Prefer the free functions above where they suffice; they do not touch
/// the context lock. This one does, so it must not be called while a
/// receive on this process is in progress.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context or if the context
/// lock is already held.
pub fn with_ctx<F, R>(f: F) -> R
where
    F: FnOnce(&mut Context) -> R,
{
    let ctx = CONTEXT.with(|c| c.ctx.clone());
    let lock = ctx.try_lock();
    match lock {
        Ok(mut guard) => f(&mut guard),
        Err(_) => panic!("with_ctx called while context is already locked"),
    }
}

/// Executes an async function with mutable access to the current context.
///
/// # Panics
///
/// Panics if called outside of a Wisp process context.
pub async fn with_ctx_async<F, Fut, R>(f: F) -> R
where
    F: FnOnce(&mut Context) -> Fut,
    Fut: Future<Output = R>,
{
    let ctx = CONTEXT.with(|c| c.ctx.clone());
    let mut guard = ctx.lock().await;
    f(&mut guard).await
}
