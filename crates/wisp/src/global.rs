//! Global runtime for Wisp.
//!
//! This module provides a process-wide runtime that can be accessed from
//! anywhere, similar to how `tokio::spawn` works with tokio's global
//! runtime. Call [`init`] once at startup, then use `wisp::spawn` and
//! friends anywhere in your code.
//!
//! ```ignore
//! use wisp::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     wisp::init();
//!
//!     let pid = wisp::spawn(|| async move {
//!         println!("hello from {}", wisp::current_pid());
//!     });
//! }
//! ```

use crate::runtime::{Runtime, RuntimeHandle};
use std::future::Future;
use std::sync::OnceLock;
use wisp_core::{Pid, Ref};
use wisp_runtime::{current_pid, RegisterError};

/// Global runtime instance.
static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Initializes the global runtime.
///
/// Calling this multiple times is safe; only the first call has any
/// effect.
pub fn init() {
    RUNTIME.get_or_init(Runtime::new);
}

/// Returns a handle to the global runtime.
///
/// # Panics
///
/// Panics if the global runtime has not been initialized. Call
/// `wisp::init()` first.
pub fn handle() -> RuntimeHandle {
    RUNTIME
        .get()
        .expect("Wisp runtime not initialized. Call wisp::init() first.")
        .handle()
}

/// Returns a handle to the global runtime, or `None` if not initialized.
pub fn try_handle() -> Option<RuntimeHandle> {
    RUNTIME.get().map(|r| r.handle())
}

/// Spawns a new process on the global runtime.
///
/// # Panics
///
/// Panics if the global runtime has not been initialized.
pub fn spawn<F, Fut>(f: F) -> Pid
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    handle().spawn(f)
}

/// Spawns a new process linked to the calling process.
///
/// The link is in place before the child runs, so a child that crashes
/// immediately still signals the caller.
///
/// # Panics
///
/// Panics if the global runtime has not been initialized or if called
/// outside of a process context.
pub fn spawn_link<F, Fut>(f: F) -> Pid
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    handle().spawn_link(current_pid(), f)
}

/// Spawns a new process monitored by the calling process.
///
/// Returns the pid and the monitor reference; exactly one `Down` message
/// carrying the reference will be delivered to the caller's mailbox when
/// the child exits.
///
/// # Panics
///
/// Panics if the global runtime has not been initialized or if called
/// outside of a process context.
pub fn spawn_monitor<F, Fut>(f: F) -> (Pid, Ref)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    handle().spawn_monitor(current_pid(), f)
}

/// Returns `true` if the process is alive.
///
/// # Panics
///
/// Panics if the global runtime has not been initialized.
pub fn alive(pid: Pid) -> bool {
    handle().alive(pid)
}

/// Registers a name for a process on the global runtime.
///
/// # Panics
///
/// Panics if the global runtime has not been initialized.
pub fn register(name: impl Into<String>, pid: Pid) -> Result<(), RegisterError> {
    handle().register(name, pid)
}

/// Unregisters a name, returning the pid it mapped to.
///
/// # Panics
///
/// Panics if the global runtime has not been initialized.
pub fn unregister(name: &str) -> Option<Pid> {
    handle().unregister(name)
}

/// Looks up a process by registered name.
///
/// # Panics
///
/// Panics if the global runtime has not been initialized.
pub fn whereis(name: &str) -> Option<Pid> {
    handle().whereis(name)
}
