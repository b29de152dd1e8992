//! The Wisp runtime: spawning and process management.
//!
//! The [`Runtime`] owns the process table and is the entry point for
//! running Wisp programs. A cloneable [`RuntimeHandle`] does the actual
//! spawning and can be passed freely between threads and processes.

use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use wisp_core::{Pid, Ref};
use wisp_runtime::{
    Context, Mailbox, ProcessHandle, ProcessScope, ProcessState, ProcessTable, RegisterError,
};

/// The Wisp runtime.
///
/// Owns the process table. Processes run as tokio tasks on whatever tokio
/// runtime is current when they are spawned.
pub struct Runtime {
    table: ProcessTable,
}

impl Runtime {
    /// Creates a new runtime with an empty process table.
    pub fn new() -> Self {
        Self {
            table: ProcessTable::new(),
        }
    }

    /// Returns a handle to the runtime that can be cloned and shared.
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            table: self.table.clone(),
        }
    }

    /// Returns the process table.
    pub fn table(&self) -> &ProcessTable {
        &self.table
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Relations to install before a spawned process first runs.
///
/// Installing them ahead of the tokio task means there is no window in
/// which the child can exit unlinked or unmonitored.
#[derive(Default)]
struct SpawnRelations {
    link: Option<Pid>,
    monitor: Option<(Pid, Ref)>,
}

/// A cloneable handle to the runtime.
#[derive(Clone)]
pub struct RuntimeHandle {
    table: ProcessTable,
}

impl RuntimeHandle {
    /// Returns the process table.
    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    /// Spawns a new process.
    ///
    /// The process function should return a future that represents the
    /// process's lifetime. Use task-local functions like `current_pid()`,
    /// `recv()`, `send()`, etc. to interact with the runtime from inside
    /// the body.
    pub fn spawn<F, Fut>(&self, f: F) -> Pid
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_internal(f, SpawnRelations::default())
    }

    /// Spawns a new process linked to `parent`.
    ///
    /// The link is installed on both sides before the child starts
    /// running, so a child that crashes immediately still signals the
    /// parent.
    pub fn spawn_link<F, Fut>(&self, parent: Pid, f: F) -> Pid
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_internal(
            f,
            SpawnRelations {
                link: Some(parent),
                monitor: None,
            },
        )
    }

    /// Spawns a new process monitored by `observer`.
    ///
    /// Returns the pid and the monitor reference. The monitor is in place
    /// before the child starts running, so the `Down` signal cannot be
    /// missed.
    pub fn spawn_monitor<F, Fut>(&self, observer: Pid, f: F) -> (Pid, Ref)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let reference = Ref::new();
        let pid = self.spawn_internal(
            f,
            SpawnRelations {
                link: None,
                monitor: Some((observer, reference)),
            },
        );
        (pid, reference)
    }

    fn spawn_internal<F, Fut>(&self, f: F, relations: SpawnRelations) -> Pid
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let pid = Pid::new();
        let (mailbox, sender) = Mailbox::new();

        let mut initial = ProcessState::new(pid);
        if let Some(parent) = relations.link {
            initial.links.insert(parent);
        }
        if let Some((observer, reference)) = relations.monitor {
            initial.monitored_by.insert(reference, observer);
        }
        let state = Arc::new(parking_lot::RwLock::new(initial));

        let handle = ProcessHandle::new(pid, sender, state.clone());
        self.table.insert(handle.clone());

        // Install the peer side of any relation now that the child is in
        // the table.
        if let Some(parent) = relations.link {
            let installed = self
                .table
                .get(parent)
                .map(|parent_handle| parent_handle.try_add_link(pid))
                .unwrap_or(false);
            if !installed {
                // The parent exited first; the child runs unlinked.
                handle.remove_link(parent);
            }
        }
        if let Some((observer, reference)) = relations.monitor {
            if let Some(observer_handle) = self.table.get(observer) {
                observer_handle.add_monitor(reference, pid);
            }
        }

        let table = self.table.clone();
        let ctx = Context::new(pid, mailbox, state, table.clone());

        debug!(%pid, "process spawned");
        let join = tokio::spawn(async move {
            // ProcessScope sets up task-local storage so functions like
            // current_pid(), recv(), send(), etc. work, and turns panics
            // into abnormal exit reasons.
            let reason = ProcessScope::new(ctx).run(f).await;
            table.process_exit(pid, reason);
        });
        handle.set_abort_handle(join.abort_handle());

        pid
    }

    /// Returns `true` if the process is alive.
    pub fn alive(&self, pid: Pid) -> bool {
        self.table.alive(pid)
    }

    /// Sends a typed message to a process. A no-op for dead or unknown
    /// pids.
    pub fn send<M: wisp_core::Term>(&self, to: Pid, msg: &M) {
        self.table.send(to, msg);
    }

    /// Links two processes.
    pub fn link(&self, a: Pid, b: Pid) {
        self.table.link(a, b);
    }

    /// Removes the link between two processes, if any.
    pub fn unlink(&self, a: Pid, b: Pid) {
        self.table.unlink(a, b);
    }

    /// Registers a name for a process.
    pub fn register(&self, name: impl Into<String>, pid: Pid) -> Result<(), RegisterError> {
        self.table.register_name(name.into(), pid)
    }

    /// Unregisters a name, returning the pid it mapped to.
    pub fn unregister(&self, name: &str) -> Option<Pid> {
        self.table.unregister_name(name)
    }

    /// Looks up a process by registered name.
    pub fn whereis(&self, name: &str) -> Option<Pid> {
        self.table.whereis(name)
    }

    /// Returns all registered names.
    pub fn registered(&self) -> Vec<String> {
        self.table.registered_names()
    }
}
