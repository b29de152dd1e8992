//! Process execution context.
//!
//! The [`Context`] gives a process access to its own mailbox and to the
//! runtime services: send, selective receive, links, monitors, and the
//! name registry. Exactly one context exists per process; it is owned by
//! the process body and never shared.
//!
//! The services half is split into [`ProcessServices`], which is cheaply
//! cloneable and does not touch the mailbox. Sends and relation changes
//! go through it, so they stay available while the mailbox is busy with a
//! receive (including from inside a receive arm).

use crate::error::RegisterError;
use crate::mailbox::Mailbox;
use crate::process_handle::ProcessState;
use crate::selector::Selector;
use crate::table::ProcessTable;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use wisp_core::{ExitReason, Pid, RawTerm, Ref, SystemMessage, Term};

/// The mailbox-free half of a process context.
///
/// Everything here needs only the process table and this process's shared
/// state, so it can run concurrently with a receive on the same process.
#[derive(Clone)]
pub struct ProcessServices {
    pid: Pid,
    state: Arc<RwLock<ProcessState>>,
    table: ProcessTable,
}

impl ProcessServices {
    /// Returns this process's pid.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Sends a message to another process.
    ///
    /// The message is encoded (copied) at this call site; sending to a
    /// dead or unknown pid is a silent no-op.
    pub fn send<M: Term>(&self, to: Pid, msg: &M) {
        self.table.send(to, msg);
    }

    /// Sends pre-encoded payload bytes to another process.
    pub fn send_raw(&self, to: Pid, data: Vec<u8>) {
        self.table.send_raw(to, data);
    }

    /// Sets the trap-exit flag, returning the previous value.
    pub fn set_trap_exit(&self, trap: bool) -> bool {
        let mut state = self.state.write();
        std::mem::replace(&mut state.trap_exit, trap)
    }

    /// Returns whether this process traps exits.
    pub fn is_trapping_exits(&self) -> bool {
        self.state.read().trap_exit
    }

    /// Links this process to `other`. Idempotent; a no-op if `other` is
    /// dead or unknown.
    pub fn link(&self, other: Pid) {
        self.table.link(self.pid, other);
    }

    /// Removes the link to `other`, if any.
    pub fn unlink(&self, other: Pid) {
        self.table.unlink(self.pid, other);
    }

    /// Starts monitoring `target`, returning the monitor reference.
    ///
    /// Exactly one [`SystemMessage::Down`] carrying the reference will be
    /// delivered to this mailbox when `target` exits. Monitoring a dead or
    /// unknown pid delivers an immediate `Down` with reason
    /// `Error("noproc")`.
    pub fn monitor(&self, target: Pid) -> Ref {
        let reference = Ref::new();
        self.state.write().monitors.insert(reference, target);

        // The install is decided under the target's state lock, so it
        // either lands before the exit protocol drains the monitor set or
        // it observes the termination and goes the noproc path. Exactly
        // one Down either way.
        let installed = self
            .table
            .get(target)
            .map(|handle| handle.try_add_monitored_by(reference, self.pid))
            .unwrap_or(false);
        if !installed {
            self.state.write().monitors.remove(&reference);
            self.table.send(
                self.pid,
                &SystemMessage::down(reference, target, ExitReason::error("noproc")),
            );
        }
        reference
    }

    /// Removes a monitor without firing its `Down` message.
    ///
    /// Best-effort: a signal already in flight may still be delivered.
    pub fn demonitor(&self, reference: Ref) {
        let target = self.state.write().monitors.remove(&reference);
        if let Some(target_pid) = target {
            if let Some(target_handle) = self.table.get(target_pid) {
                target_handle.remove_monitored_by(reference);
            }
        }
    }

    /// Registers a name for this process.
    pub fn register(&self, name: impl Into<String>) -> Result<(), RegisterError> {
        self.table.register_name(name.into(), self.pid)
    }

    /// Removes a registered name.
    pub fn unregister(&self, name: &str) -> Option<Pid> {
        self.table.unregister_name(name)
    }

    /// Looks up a registered name.
    pub fn whereis(&self, name: &str) -> Option<Pid> {
        self.table.whereis(name)
    }

    /// Returns `true` if the given process has not exited.
    pub fn is_alive(&self, pid: Pid) -> bool {
        self.table.alive(pid)
    }
}

impl std::fmt::Debug for ProcessServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessServices")
            .field("pid", &self.pid)
            .finish()
    }
}

/// The execution context of a running process.
pub struct Context {
    mailbox: Mailbox,
    services: ProcessServices,
}

impl Context {
    /// Creates the context for a process. Called by the spawning layer.
    pub fn new(
        pid: Pid,
        mailbox: Mailbox,
        state: Arc<RwLock<ProcessState>>,
        table: ProcessTable,
    ) -> Self {
        Self {
            mailbox,
            services: ProcessServices { pid, state, table },
        }
    }

    /// Returns this process's pid.
    pub fn pid(&self) -> Pid {
        self.services.pid
    }

    /// Returns a clone of the mailbox-free services half.
    pub fn services(&self) -> ProcessServices {
        self.services.clone()
    }

    /// Receives the next message in arrival order.
    ///
    /// Returns `None` if the mailbox is closed.
    pub async fn recv(&mut self) -> Option<RawTerm> {
        self.mailbox.recv().await
    }

    /// Receives the next message, or `Err(())` once the timeout elapses.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<RawTerm>, ()> {
        self.mailbox.recv_timeout(timeout).await
    }

    /// Tries to receive a message without waiting.
    pub fn try_recv(&mut self) -> Option<RawTerm> {
        self.mailbox.try_recv()
    }

    /// Selective receive over this process's mailbox.
    ///
    /// See [`Mailbox::select`] for the matching and timeout semantics.
    pub async fn receive<R>(&mut self, selector: Selector<R>) -> Option<R> {
        self.mailbox.select(selector).await
    }

    /// Sends a message to another process. See [`ProcessServices::send`].
    pub fn send<M: Term>(&self, to: Pid, msg: &M) {
        self.services.send(to, msg);
    }

    /// Sends pre-encoded payload bytes to another process.
    pub fn send_raw(&self, to: Pid, data: Vec<u8>) {
        self.services.send_raw(to, data);
    }

    /// Sets the trap-exit flag, returning the previous value.
    pub fn set_trap_exit(&self, trap: bool) -> bool {
        self.services.set_trap_exit(trap)
    }

    /// Returns whether this process traps exits.
    pub fn is_trapping_exits(&self) -> bool {
        self.services.is_trapping_exits()
    }

    /// Links this process to `other`. See [`ProcessServices::link`].
    pub fn link(&self, other: Pid) {
        self.services.link(other);
    }

    /// Removes the link to `other`, if any.
    pub fn unlink(&self, other: Pid) {
        self.services.unlink(other);
    }

    /// Starts monitoring `target`. See [`ProcessServices::monitor`].
    pub fn monitor(&self, target: Pid) -> Ref {
        self.services.monitor(target)
    }

    /// Removes a monitor without firing its `Down` message.
    pub fn demonitor(&self, reference: Ref) {
        self.services.demonitor(reference);
    }

    /// Registers a name for this process.
    pub fn register(&self, name: impl Into<String>) -> Result<(), RegisterError> {
        self.services.register(name)
    }

    /// Removes a registered name.
    pub fn unregister(&self, name: &str) -> Option<Pid> {
        self.services.unregister(name)
    }

    /// Looks up a registered name.
    pub fn whereis(&self, name: &str) -> Option<Pid> {
        self.services.whereis(name)
    }

    /// Returns `true` if the given process has not exited.
    pub fn is_alive(&self, pid: Pid) -> bool {
        self.services.is_alive(pid)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("pid", &self.pid()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::MailboxSender;
    use crate::process_handle::ProcessHandle;

    fn test_context(table: &ProcessTable) -> (Context, MailboxSender) {
        let pid = Pid::new();
        let (mailbox, sender) = Mailbox::new();
        let state = Arc::new(RwLock::new(ProcessState::new(pid)));
        table.insert(ProcessHandle::new(pid, sender.clone(), state.clone()));
        (Context::new(pid, mailbox, state, table.clone()), sender)
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let table = ProcessTable::new();
        let (mut a, _sa) = test_context(&table);
        let (b, _sb) = test_context(&table);

        b.send(a.pid(), &("hello".to_string(), 1u32));
        let msg = a.recv().await.unwrap();
        assert_eq!(
            msg.decode::<(String, u32)>(),
            Some(("hello".to_string(), 1))
        );
    }

    #[tokio::test]
    async fn test_services_send_while_context_is_busy() {
        let table = ProcessTable::new();
        let (mut a, _sa) = test_context(&table);
        let (b, _sb) = test_context(&table);

        // The services half works without the context, as it does from
        // inside a receive arm.
        let services = b.services();
        services.send(a.pid(), &7u64);

        let msg = a.recv().await.unwrap();
        assert_eq!(msg.decode::<u64>(), Some(7));
    }

    #[test]
    fn test_trap_exit_flag() {
        let table = ProcessTable::new();
        let (ctx, _s) = test_context(&table);

        assert!(!ctx.is_trapping_exits());
        assert!(!ctx.set_trap_exit(true));
        assert!(ctx.is_trapping_exits());
    }

    #[test]
    fn test_link_unlink() {
        let table = ProcessTable::new();
        let (a, _sa) = test_context(&table);
        let (b, _sb) = test_context(&table);

        a.link(b.pid());
        assert!(table.get(a.pid()).unwrap().is_linked_to(b.pid()));
        assert!(table.get(b.pid()).unwrap().is_linked_to(a.pid()));

        a.unlink(b.pid());
        assert!(!table.get(a.pid()).unwrap().is_linked_to(b.pid()));
        assert!(!table.get(b.pid()).unwrap().is_linked_to(a.pid()));
    }

    #[tokio::test]
    async fn test_monitor_dead_pid_synthesizes_down() {
        let table = ProcessTable::new();
        let (mut ctx, _s) = test_context(&table);

        let ghost = Pid::new();
        let reference = ctx.monitor(ghost);

        let msg = ctx.recv().await.unwrap();
        assert_eq!(
            msg.decode::<SystemMessage>(),
            Some(SystemMessage::down(
                reference,
                ghost,
                ExitReason::error("noproc")
            ))
        );
    }

    #[tokio::test]
    async fn test_monitor_mid_exit_target_synthesizes_down() {
        let table = ProcessTable::new();
        let (mut observer, _so) = test_context(&table);
        let (target, _st) = test_context(&table);

        // The target has begun its exit but is still in the table, as it
        // is while the exit protocol runs.
        table.get(target.pid()).unwrap().begin_exit(ExitReason::Normal);

        let reference = observer.monitor(target.pid());

        // The monitor must not be installed on the drained set; the Down
        // arrives through the noproc path instead.
        assert!(table
            .get(target.pid())
            .unwrap()
            .take_monitored_by()
            .is_empty());
        let msg = observer.recv().await.unwrap();
        assert_eq!(
            msg.decode::<SystemMessage>(),
            Some(SystemMessage::down(
                reference,
                target.pid(),
                ExitReason::error("noproc")
            ))
        );
    }

    #[test]
    fn test_demonitor_clears_both_sides() {
        let table = ProcessTable::new();
        let (a, _sa) = test_context(&table);
        let (b, _sb) = test_context(&table);

        let reference = a.monitor(b.pid());
        a.demonitor(reference);

        assert!(!a.services.state.read().monitors.contains_key(&reference));
        assert!(!b
            .services
            .state
            .read()
            .monitored_by
            .contains_key(&reference));
    }

    #[test]
    fn test_register_whereis() {
        let table = ProcessTable::new();
        let (ctx, _s) = test_context(&table);

        ctx.register("me").unwrap();
        assert_eq!(ctx.whereis("me"), Some(ctx.pid()));
        assert!(matches!(
            ctx.register("me"),
            Err(RegisterError::NameTaken(_))
        ));
        assert_eq!(ctx.unregister("me"), Some(ctx.pid()));
    }
}
