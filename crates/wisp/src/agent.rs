//! Agents: simple state kept by a dedicated process.
//!
//! An [`Agent`] owns a value of type `S` inside its own process and
//! serves reads and updates one at a time, giving callers a total order
//! over state changes without locks.
//!
//! ```ignore
//! let counter = Agent::start_link(|| 0u64);
//! counter.update(|n| *n += 1).await?;
//! let value = counter.get(|n| *n).await?;
//! ```

use tokio::sync::{mpsc, oneshot};
use wisp_core::Pid;

/// A request served by the agent process.
enum Request<S> {
    Run(Box<dyn FnOnce(&mut S) + Send>),
    Stop,
}

/// Error returned when the agent process is no longer serving requests.
#[derive(Debug, thiserror::Error)]
#[error("agent {0} is not alive")]
pub struct AgentError(
    /// The agent's pid.
    pub Pid,
);

/// A handle to state owned by a dedicated process.
///
/// Cloning the handle shares the same agent; requests from all clones are
/// applied in a single total order.
pub struct Agent<S> {
    pid: Pid,
    tx: mpsc::UnboundedSender<Request<S>>,
}

impl<S> Clone for Agent<S> {
    fn clone(&self) -> Self {
        Self {
            pid: self.pid,
            tx: self.tx.clone(),
        }
    }
}

impl<S: Send + 'static> Agent<S> {
    /// Starts an agent linked to the calling process.
    ///
    /// `init` runs inside the new process to produce the initial state.
    ///
    /// # Panics
    ///
    /// Panics if the global runtime has not been initialized or if called
    /// outside of a process context.
    pub fn start_link<F>(init: F) -> Self
    where
        F: FnOnce() -> S + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Request<S>>();
        let pid = crate::global::spawn_link(move || async move {
            let mut state = init();
            let mut signals_open = true;
            loop {
                tokio::select! {
                    request = rx.recv() => match request {
                        Some(Request::Run(f)) => f(&mut state),
                        Some(Request::Stop) | None => break,
                    },
                    // The process mailbox carries only link signals here,
                    // such as the Exit message from an owner that returned
                    // normally. They are drained so the mailbox cannot
                    // grow, and the agent keeps serving its handles.
                    signal = wisp_runtime::recv(), if signals_open => {
                        if signal.is_none() {
                            signals_open = false;
                        }
                    }
                }
            }
        });
        Self { pid, tx }
    }

    /// The pid of the agent's process.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Reads from the state and returns a derived value.
    pub async fn get<F, R>(&self, f: F) -> Result<R, AgentError>
    where
        F: FnOnce(&S) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.call(move |state| f(state)).await
    }

    /// Applies an update to the state, waiting until it has run.
    pub async fn update<F>(&self, f: F) -> Result<(), AgentError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.call(move |state| f(state)).await
    }

    /// Applies an update and returns a value derived from the old state.
    pub async fn get_and_update<F, R>(&self, f: F) -> Result<R, AgentError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.call(f).await
    }

    /// Stops the agent. The agent exits normally; pending requests
    /// already queued are served first.
    pub fn stop(&self) -> Result<(), AgentError> {
        self.tx
            .send(Request::Stop)
            .map_err(|_| AgentError(self.pid))
    }

    /// Sends a closure to the agent process and waits for its reply.
    async fn call<F, R>(&self, f: F) -> Result<R, AgentError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request::Run(Box::new(move |state| {
                let _ = reply_tx.send(f(state));
            })))
            .map_err(|_| AgentError(self.pid))?;
        reply_rx.await.map_err(|_| AgentError(self.pid))
    }
}

impl<S> std::fmt::Debug for Agent<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent").field("pid", &self.pid).finish()
    }
}
