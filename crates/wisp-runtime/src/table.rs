//! The process table: pid lookup, the name registry, message routing, and
//! the exit protocol.
//!
//! This is the runtime's only process-wide shared state. Both maps are
//! concurrent; per-process relation state lives behind each handle's own
//! lock, so no lock is ever held across a call into another process's
//! state.

use crate::error::RegisterError;
use crate::process_handle::ProcessHandle;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, trace};
use wisp_core::{ExitReason, Pid, SystemMessage, Term};

/// A concurrent table of all running processes and registered names.
#[derive(Clone)]
pub struct ProcessTable {
    /// Pid to handle.
    processes: Arc<DashMap<Pid, ProcessHandle>>,
    /// Registered name to pid.
    names: Arc<DashMap<String, Pid>>,
}

impl ProcessTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            processes: Arc::new(DashMap::new()),
            names: Arc::new(DashMap::new()),
        }
    }

    /// Adds a process to the table.
    pub fn insert(&self, handle: ProcessHandle) {
        self.processes.insert(handle.pid(), handle);
    }

    /// Looks up a process handle.
    pub fn get(&self, pid: Pid) -> Option<ProcessHandle> {
        self.processes.get(&pid).map(|r| r.value().clone())
    }

    /// Returns `true` if the process exists and has not exited.
    pub fn alive(&self, pid: Pid) -> bool {
        self.get(pid).map(|h| h.is_alive()).unwrap_or(false)
    }

    /// Returns the number of processes in the table.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Routes raw payload bytes to a process mailbox.
    ///
    /// Sending to a dead or unknown pid is a silent no-op, never an error.
    pub fn send_raw(&self, pid: Pid, data: Vec<u8>) {
        match self.get(pid) {
            Some(handle) => handle.send_raw(data),
            None => trace!(%pid, "dropped message to unknown process"),
        }
    }

    /// Encodes and routes a message to a process mailbox.
    pub fn send<M: Term>(&self, pid: Pid, msg: &M) {
        self.send_raw(pid, msg.encode());
    }

    /// Registers a name for a live process.
    ///
    /// # Errors
    ///
    /// [`RegisterError::NameTaken`] if the name maps to a live process,
    /// [`RegisterError::NoProcess`] if `pid` is dead or unknown.
    pub fn register_name(&self, name: String, pid: Pid) -> Result<(), RegisterError> {
        if !self.alive(pid) {
            return Err(RegisterError::NoProcess(pid));
        }
        match self.names.entry(name) {
            Entry::Occupied(mut occupied) => {
                // A stale entry for a process mid-exit may be replaced.
                if self.alive(*occupied.get()) {
                    return Err(RegisterError::NameTaken(occupied.key().clone()));
                }
                occupied.insert(pid);
                Ok(())
            }
            Entry::Vacant(vacant) => {
                vacant.insert(pid);
                Ok(())
            }
        }
    }

    /// Looks up a registered name.
    pub fn whereis(&self, name: &str) -> Option<Pid> {
        self.names.get(name).map(|r| *r.value())
    }

    /// Removes a name, returning the pid it mapped to.
    pub fn unregister_name(&self, name: &str) -> Option<Pid> {
        self.names.remove(name).map(|(_, pid)| pid)
    }

    /// Returns all registered names.
    pub fn registered_names(&self) -> Vec<String> {
        self.names.iter().map(|r| r.key().clone()).collect()
    }

    /// Installs a symmetric link between two live processes.
    ///
    /// Idempotent; a no-op if either side is dead or unknown. Each side is
    /// installed under that process's state lock, so a link raced against
    /// either peer's exit either completes before the exit protocol drains
    /// the link set or installs nothing at all.
    pub fn link(&self, a: Pid, b: Pid) {
        if a == b {
            return;
        }
        let (Some(ha), Some(hb)) = (self.get(a), self.get(b)) else {
            return;
        };
        if !ha.try_add_link(b) {
            return;
        }
        if !hb.try_add_link(a) {
            ha.remove_link(b);
        }
    }

    /// Removes a symmetric link. A no-op for absent links or dead peers.
    pub fn unlink(&self, a: Pid, b: Pid) {
        if let Some(ha) = self.get(a) {
            ha.remove_link(b);
        }
        if let Some(hb) = self.get(b) {
            hb.remove_link(a);
        }
    }

    /// Runs the exit protocol for `pid`, at most once per process.
    ///
    /// In order: registered names are removed, links are resolved (trap or
    /// normal reason => an `Exit` message; abnormal reason to a
    /// non-trapping peer => the peer is terminated with the same reason,
    /// cascading pairwise through its own links), every monitor on `pid`
    /// fires exactly one `Down`, monitors `pid` held elsewhere are
    /// dropped, and finally the handle leaves the table. The pid stays a
    /// valid dead token: `alive` reports false and sends are dropped.
    pub fn process_exit(&self, pid: Pid, reason: ExitReason) {
        let Some(handle) = self.get(pid) else {
            return;
        };
        if !handle.begin_exit(reason.clone()) {
            return;
        }
        debug!(%pid, %reason, "process exited");

        // Names first: whereis must never observe a dead pid.
        self.names.retain(|_, registered| *registered != pid);

        for peer_pid in handle.take_links() {
            let Some(peer) = self.get(peer_pid) else {
                continue;
            };
            peer.remove_link(pid);
            if peer.is_trapping_exits() || reason.is_normal() {
                peer.send(&SystemMessage::exit(pid, reason.clone()));
            } else {
                debug!(from = %pid, to = %peer_pid, %reason, "link cascade");
                peer.abort();
                self.process_exit(peer_pid, reason.clone());
            }
        }

        for (reference, observer_pid) in handle.take_monitored_by() {
            if let Some(observer) = self.get(observer_pid) {
                observer.remove_monitor(reference);
                observer.send(&SystemMessage::down(reference, pid, reason.clone()));
            }
        }

        // Drop the monitors this process held on others.
        for (reference, target_pid) in handle.take_monitors() {
            if let Some(target) = self.get(target_pid) {
                target.remove_monitored_by(reference);
            }
        }

        self.processes.remove(&pid);
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessTable")
            .field("processes", &self.processes.len())
            .field("names", &self.names.len())
            .finish()
    }
}
