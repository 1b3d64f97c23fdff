//! Dispatcher: routes inbound requests to command handlers and owns the
//! serialization discipline around the policy store.
//!
//! Lifecycle is a two-state machine. While **Active** the dispatcher accepts
//! Hide, Unhide, and Uninstall; after a successful Uninstall it is
//! **Terminated** and every further request is answered with a protocol
//! error without touching the lock. The terminal transition happens under
//! the same lock acquisition as the final clear, so no concurrent request
//! can observe a half-cleared store.
//!
//! Per request: reject if terminated, acquire the store lock (racing the
//! shutdown signal), decode the path if the command needs one, run the
//! handler, drop the lock, build exactly one reply. The guard is released
//! by RAII on every path, so no outcome can leave the store unavailable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::command::{Command, Request, Response, TransportRequest};
use crate::effector::{Effector, TracingEffector};
use crate::error::AgentError;
use crate::reply::{self, WireReply};
use crate::store::PolicyStore;

/// Builds a [`Dispatcher`] with an injected effector and optional shutdown
/// signal. No ambient global state: every dispatcher owns its store.
#[derive(Default)]
pub struct DispatcherBuilder {
    effector: Option<Arc<dyn Effector>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl DispatcherBuilder {
    /// Set the effector invoked by the command handlers. Defaults to
    /// [`TracingEffector`].
    pub fn effector(mut self, effector: Arc<dyn Effector>) -> Self {
        self.effector = Some(effector);
        self
    }

    /// Attach a shutdown signal. Any change on the channel (or its sender
    /// dropping) aborts pending lock acquisitions with a system error.
    pub fn shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Build the dispatcher.
    pub fn build(self) -> Dispatcher {
        let (shutdown, shutdown_hold) = match self.shutdown {
            Some(rx) => (rx, None),
            None => {
                // No signal wired in: hold our own sender so the channel
                // never reads as closed.
                let (tx, rx) = watch::channel(false);
                (rx, Some(tx))
            }
        };
        Dispatcher {
            store: Mutex::new(PolicyStore::new()),
            effector: self.effector.unwrap_or_else(|| Arc::new(TracingEffector)),
            terminated: AtomicBool::new(false),
            shutdown,
            _shutdown_hold: shutdown_hold,
        }
    }
}

/// Outcome of dispatching one raw frame.
#[derive(Clone, Debug)]
pub struct DispatchOutcome {
    /// The in-process view of the response.
    pub response: Response,
    /// The wire-ready reply to hand to the transport.
    pub reply: WireReply,
    /// Whether this request left the dispatcher terminated. The transport
    /// tears the endpoint down after delivering the reply.
    pub terminated: bool,
}

/// Routes requests to handlers and serializes all policy-store mutations.
pub struct Dispatcher {
    store: Mutex<PolicyStore>,
    effector: Arc<dyn Effector>,
    // Mirrors the store's terminated flag so post-uninstall requests are
    // rejected without acquiring the lock. Written only under the lock.
    terminated: AtomicBool,
    shutdown: watch::Receiver<bool>,
    _shutdown_hold: Option<watch::Sender<bool>>,
}

impl Dispatcher {
    /// Start building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Whether a successful uninstall has run.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Snapshot of the hidden set, for diagnostics and tests.
    pub async fn hidden_paths(&self) -> Vec<String> {
        self.store.lock().await.paths()
    }

    /// Handle one raw frame and produce its correlated reply. Always
    /// returns exactly one outcome; every failure is carried as a result
    /// code, never a panic or a silent drop.
    pub async fn dispatch(&self, request: TransportRequest) -> DispatchOutcome {
        let correlation = request.correlation;
        let response = self.process(request).await;
        if let Some(msg) = &response.message {
            warn!(
                target: "pathveil::dispatch",
                command = response.command_id,
                code = response.result.as_u8(),
                %msg,
                "request rejected"
            );
        }
        let reply = reply::build(correlation, &response);
        DispatchOutcome { reply, terminated: self.is_terminated(), response }
    }

    async fn process(&self, request: TransportRequest) -> Response {
        let Some(command) = Command::from_id(request.command_id) else {
            let err = AgentError::Protocol(format!("unknown command id {}", request.command_id));
            return Response::failed_raw(request.command_id, &err);
        };
        if self.is_terminated() {
            return Response::failed(command, &AgentError::Protocol("agent uninstalled".into()));
        }
        let mut store = match self.acquire().await {
            Ok(guard) => guard,
            Err(err) => return Response::failed(command, &err),
        };
        let outcome = self.run(&mut store, command, &request.attrs).await;
        drop(store);
        match outcome {
            Ok(()) => Response::ok(command),
            Err(err) => Response::failed(command, &err),
        }
    }

    /// Acquire the store lock, racing the shutdown signal. Fails closed: a
    /// shutdown-interrupted acquisition never reaches a handler.
    async fn acquire(&self) -> Result<MutexGuard<'_, PolicyStore>, AgentError> {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow_and_update() {
            return Err(AgentError::System("shutdown in progress".into()));
        }
        loop {
            tokio::select! {
                guard = self.store.lock() => return Ok(guard),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        return Err(AgentError::System(
                            "shutdown interrupted lock acquisition".into(),
                        ));
                    }
                }
            }
        }
    }

    async fn run(
        &self,
        store: &mut PolicyStore,
        command: Command,
        attrs: &[u8],
    ) -> Result<(), AgentError> {
        // A request that raced past the atomic check while uninstall held
        // the lock lands here; the store's own flag is authoritative.
        if store.is_terminated() {
            return Err(AgentError::Protocol("agent uninstalled".into()));
        }
        match Request::decode(command, attrs)? {
            Request::Hide { path } => self.hide(store, path).await,
            Request::Unhide { path } => self.unhide(store, &path).await,
            Request::Uninstall => self.uninstall(store).await,
        }
    }

    /// Hide: effect first, then record. Either both happen or neither.
    async fn hide(&self, store: &mut PolicyStore, path: String) -> Result<(), AgentError> {
        self.effector.apply_hide(&path).await?;
        let newly_hidden = store.insert(path.clone());
        info!(target: "pathveil::dispatch", %path, newly_hidden, "path hidden");
        Ok(())
    }

    /// Unhide: membership is validated before the effector is invoked.
    async fn unhide(&self, store: &mut PolicyStore, path: &str) -> Result<(), AgentError> {
        if !store.contains(path) {
            return Err(AgentError::PathNotFound(path.to_owned()));
        }
        self.effector.apply_unhide(path).await?;
        store.remove(path)?;
        info!(target: "pathveil::dispatch", %path, "path unhidden");
        Ok(())
    }

    /// Uninstall: reverse every active hide in one shot, then clear and
    /// terminate under the lock already held. Fail-all semantics: if the
    /// reversal fails, the store and lifecycle state are untouched and the
    /// agent stays active.
    async fn uninstall(&self, store: &mut PolicyStore) -> Result<(), AgentError> {
        let paths = store.paths();
        self.effector.apply_uninstall_all(&paths).await?;
        let cleared = store.clear();
        self.terminated.store(true, Ordering::SeqCst);
        info!(target: "pathveil::dispatch", cleared, "agent uninstalled");
        Ok(())
    }
}
