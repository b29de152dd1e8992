//! # wisp-runtime
//!
//! Per-process machinery for Wisp: the mailbox and its selective-receive
//! logic, process handles and shared state, the process table (with the
//! exit protocol and the name registry), the execution [`Context`], and
//! task-local accessors for code running inside a process.
//!
//! The spawning surface lives one layer up, in the `wisp` crate; this crate
//! is deliberately unaware of how process bodies are started.

#![deny(missing_docs)]

mod context;
mod error;
mod mailbox;
mod process_handle;
mod selector;
mod table;
mod task_local;

pub use context::{Context, ProcessServices};
pub use error::RegisterError;
pub use mailbox::{Mailbox, MailboxSender};
pub use process_handle::{ProcessHandle, ProcessState};
pub use selector::Selector;
pub use table::ProcessTable;
pub use task_local::{
    current_pid, demonitor, link, monitor, receive, recv, recv_timeout, register, send, send_raw,
    trap_exit, try_current_pid, try_recv, unlink, unregister, whereis, with_ctx, with_ctx_async,
    ProcessScope,
};
