//! Process handles and shared per-process state.
//!
//! A [`ProcessHandle`] is the cloneable, table-stored view of a process:
//! it can enqueue mailbox messages and read or adjust the relation state
//! (links, monitors, trap flag). The runtime is the sole writer of the
//! terminated flag, through [`ProcessHandle::begin_exit`].

use crate::mailbox::MailboxSender;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tokio::task::AbortHandle;
use wisp_core::{ExitReason, Pid, RawTerm, Ref, Term};

/// Shared state between a process and its handles.
#[derive(Debug)]
pub struct ProcessState {
    /// The process identifier.
    pub pid: Pid,
    /// Whether exit signals from linked peers are delivered as messages.
    pub trap_exit: bool,
    /// Linked peers (the relation is symmetric; this is our side).
    pub links: HashSet<Pid>,
    /// Monitors this process holds (ref -> observed pid).
    pub monitors: HashMap<Ref, Pid>,
    /// Monitors held on this process (ref -> observer pid).
    pub monitored_by: HashMap<Ref, Pid>,
    /// Whether the exit protocol has run for this process.
    pub terminated: bool,
    /// The exit reason, once terminated.
    pub exit_reason: Option<ExitReason>,
}

impl ProcessState {
    /// Creates the state for a fresh process.
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            trap_exit: false,
            links: HashSet::new(),
            monitors: HashMap::new(),
            monitored_by: HashMap::new(),
            terminated: false,
            exit_reason: None,
        }
    }
}

/// A handle to a process.
///
/// Cloneable and shareable across workers; all mutation goes through the
/// internal lock.
#[derive(Clone)]
pub struct ProcessHandle {
    pid: Pid,
    sender: MailboxSender,
    state: Arc<RwLock<ProcessState>>,
    /// Abort handle for the backing task, installed right after spawn.
    /// Used only by the link cascade.
    abort: Arc<OnceLock<AbortHandle>>,
}

impl ProcessHandle {
    /// Creates a new handle over a process's sender and state.
    pub fn new(pid: Pid, sender: MailboxSender, state: Arc<RwLock<ProcessState>>) -> Self {
        Self {
            pid,
            sender,
            state,
            abort: Arc::new(OnceLock::new()),
        }
    }

    /// Returns the process identifier.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Enqueues raw payload bytes into the process mailbox.
    ///
    /// Delivery to a closed mailbox is silently dropped; send is never an
    /// error.
    pub fn send_raw(&self, data: Vec<u8>) {
        if self.sender.send(RawTerm::new(data)).is_err() {
            tracing::trace!(pid = %self.pid, "dropped message to closed mailbox");
        }
    }

    /// Encodes and enqueues a message.
    pub fn send<M: Term>(&self, msg: &M) {
        self.send_raw(msg.encode());
    }

    /// Returns `true` if the process has not reached its exit.
    pub fn is_alive(&self) -> bool {
        !self.state.read().terminated
    }

    /// Returns `true` if the process is trapping exits.
    pub fn is_trapping_exits(&self) -> bool {
        self.state.read().trap_exit
    }

    /// Sets the trap-exit flag, returning the previous value.
    pub fn set_trap_exit(&self, trap: bool) -> bool {
        let mut state = self.state.write();
        std::mem::replace(&mut state.trap_exit, trap)
    }

    /// Records a link on our side unless this process has already begun
    /// its exit. Callers maintain symmetry.
    ///
    /// The terminated check and the insert happen under one write lock:
    /// an install that observes a live process lands before the exit
    /// protocol drains the link set, so the link cannot be lost.
    pub fn try_add_link(&self, other: Pid) -> bool {
        let mut state = self.state.write();
        if state.terminated {
            return false;
        }
        state.links.insert(other);
        true
    }

    /// Removes a link on our side.
    pub fn remove_link(&self, other: Pid) {
        self.state.write().links.remove(&other);
    }

    /// Returns `true` if a link to `other` is present.
    pub fn is_linked_to(&self, other: Pid) -> bool {
        self.state.read().links.contains(&other)
    }

    /// Records a monitor this process holds on `target`.
    pub fn add_monitor(&self, reference: Ref, target: Pid) {
        self.state.write().monitors.insert(reference, target);
    }

    /// Removes a monitor this process holds.
    pub fn remove_monitor(&self, reference: Ref) -> Option<Pid> {
        self.state.write().monitors.remove(&reference)
    }

    /// Records a monitor held on this process by `observer`, unless this
    /// process has already begun its exit.
    ///
    /// Decided under the state write lock for the same reason as
    /// [`ProcessHandle::try_add_link`]: a successful install is always
    /// seen by the exit protocol's drain, so the `Down` fires exactly
    /// once.
    pub fn try_add_monitored_by(&self, reference: Ref, observer: Pid) -> bool {
        let mut state = self.state.write();
        if state.terminated {
            return false;
        }
        state.monitored_by.insert(reference, observer);
        true
    }

    /// Removes a monitor held on this process.
    pub fn remove_monitored_by(&self, reference: Ref) -> Option<Pid> {
        self.state.write().monitored_by.remove(&reference)
    }

    /// Drains the link set. Used by the exit protocol.
    pub fn take_links(&self) -> Vec<Pid> {
        self.state.write().links.drain().collect()
    }

    /// Drains the monitors held on this process. Used by the exit protocol.
    pub fn take_monitored_by(&self) -> Vec<(Ref, Pid)> {
        self.state.write().monitored_by.drain().collect()
    }

    /// Drains the monitors this process holds. Used by the exit protocol.
    pub fn take_monitors(&self) -> Vec<(Ref, Pid)> {
        self.state.write().monitors.drain().collect()
    }

    /// Transitions the process to terminated, exactly once.
    ///
    /// Returns `true` if this call performed the transition; `false` if
    /// the process was already terminated (the exit protocol must then not
    /// run again).
    pub fn begin_exit(&self, reason: ExitReason) -> bool {
        let mut state = self.state.write();
        if state.terminated {
            return false;
        }
        state.terminated = true;
        state.exit_reason = Some(reason);
        true
    }

    /// Returns the exit reason if the process has terminated.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.state.read().exit_reason.clone()
    }

    /// Installs the abort handle for the backing task.
    pub fn set_abort_handle(&self, handle: AbortHandle) {
        let _ = self.abort.set(handle);
    }

    /// Stops the backing task at its next suspension point.
    ///
    /// Only the link cascade calls this; there is no user-facing way to
    /// stop a running process from the outside.
    pub fn abort(&self) {
        if let Some(handle) = self.abort.get() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("alive", &self.is_alive())
            .finish()
    }
}
