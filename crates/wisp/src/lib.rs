//! # Wisp
//!
//! Lightweight isolated processes for Rust: mailboxes, selective receive,
//! links, monitors, a name registry, and the [`task`] and [`agent`]
//! abstractions built on top.
//!
//! # Overview
//!
//! - **Processes**: isolated units of concurrency that share nothing and
//!   communicate only by copying messages into each other's mailboxes
//! - **Selective receive**: pick messages out of the mailbox by pattern,
//!   leaving the rest untouched and in order
//! - **Links**: bidirectional failure propagation; an abnormal exit takes
//!   linked peers down unless they trap exits
//! - **Monitors**: unidirectional observation; exactly one `Down` message
//!   per monitor when the target exits
//! - **Registry**: name-to-pid registration with automatic cleanup
//! - **Tasks**: processes computing a single joinable value
//! - **Agents**: state owned by one process, updated in a total order
//!
//! # Quick Start
//!
//! ```ignore
//! #[tokio::main]
//! async fn main() {
//!     wisp::init();
//!
//!     let pid = wisp::spawn(|| async move {
//!         while let Some(msg) = wisp::recv().await {
//!             if let Some(text) = msg.decode::<String>() {
//!                 println!("{} got: {}", wisp::current_pid(), text);
//!             }
//!         }
//!     });
//!
//!     wisp::handle().send(pid, &"hello".to_string());
//! }
//! ```

#![deny(missing_docs)]

pub mod agent;
mod global;
mod runtime;
pub mod task;

pub use agent::{Agent, AgentError};
pub use runtime::{Runtime, RuntimeHandle};
pub use task::{JoinError, Task};

// Re-export global runtime functions
pub use global::{
    alive, handle, init, register, spawn, spawn_link, spawn_monitor, try_handle, unregister,
    whereis,
};

// Re-export task-local functions for process operations inside a body
pub use wisp_runtime::{
    current_pid, demonitor, link, monitor, receive, recv, recv_timeout, send, send_raw, trap_exit,
    try_current_pid, try_recv, unlink, with_ctx, with_ctx_async,
};

// Re-export core types
pub use wisp_core::{ExitReason, Pid, RawTerm, Ref, SystemMessage, Term};

// Re-export runtime types
pub use wisp_runtime::{Context, ProcessTable, RegisterError, Selector};

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```ignore
/// use wisp::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use wisp_core::{ExitReason, Pid, RawTerm, Ref, SystemMessage, Term};

    // Runtime and process
    pub use crate::runtime::{Runtime, RuntimeHandle};
    pub use wisp_runtime::{Context, Selector};

    // Tasks and agents
    pub use crate::agent::{Agent, AgentError};
    pub use crate::task::{JoinError, Task};

    // Task-local functions for process operations inside a body
    pub use wisp_runtime::{
        current_pid, demonitor, link, monitor, receive, recv, recv_timeout, send, send_raw,
        trap_exit, try_current_pid, try_recv, unlink, with_ctx, with_ctx_async,
    };
}
