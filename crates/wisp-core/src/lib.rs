//! # wisp-core
//!
//! Core types for Wisp, a lightweight-process concurrency runtime.
//!
//! This crate provides the foundational value types used throughout the
//! Wisp workspace:
//!
//! - [`Pid`] - Process identifier
//! - [`Ref`] - Unique reference for monitors and one-shot replies
//! - [`ExitReason`] - Process termination reasons
//! - [`Term`] - Trait for serializable message values (copy-on-send)
//! - [`RawTerm`] - An undecoded message payload, for pattern dispatch
//! - [`SystemMessage`] - Exit and Down signals delivered to mailboxes
//!
//! Nothing in this crate holds runtime state; it is shared by the runtime
//! machinery and by user code defining message types.

#![deny(missing_docs)]

mod exit_reason;
mod pid;
mod reference;
mod system_message;
mod term;

pub use exit_reason::ExitReason;
pub use pid::Pid;
pub use reference::Ref;
pub use system_message::SystemMessage;
pub use term::{DecodeError, RawTerm, Term};
