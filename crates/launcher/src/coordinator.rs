//! Launch coordination.
//!
//! The host reports startup through callbacks that may fire on its own
//! dispatch thread, possibly more than once. [`LaunchCoordinator`] turns
//! that into a single awaited result:
//!
//! - one listener for "delegate will be created" runs the pre-create hook
//! - one listener for "context initialized" runs the post-ready hook and
//!   resolves the launch
//! - both listeners remove themselves after their first event
//!
//! Resolution goes through [`CompletionSignal`], which can be resolved at
//! most once from any thread; later attempts are no-ops.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use events::{Event, EventBus, ListenerId};
use launcher_core::{ActivityHandle, LifecycleState, LifecycleStateMachine, RuntimeContext};
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::config::{LaunchPolicy, LoaderConfig};
use crate::dev_menu::DevMenuRegistry;
use crate::error::{LaunchError, Result};
use crate::host::RuntimeHost;

/// One-shot, thread-safe completion for a single launch attempt.
pub struct CompletionSignal<T> {
    resolved: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> CompletionSignal<T> {
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (sender, receiver) = oneshot::channel();
        let signal = Self {
            resolved: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
        };
        (signal, receiver)
    }

    /// Deliver `value` to the waiting side.
    ///
    /// Only the first call wins and returns `true`. Later calls, and calls
    /// after the receiver was dropped, change nothing.
    pub fn resolve(&self, value: T) -> bool {
        if self.resolved.swap(true, Ordering::AcqRel) {
            return false;
        }

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            if sender.send(value).is_err() {
                trace!("Completion resolved after its receiver was dropped");
            }
        }
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

/// Atomically stored [`LifecycleState`] that only moves forward.
#[derive(Debug)]
pub struct LifecycleCell(AtomicU8);

impl LifecycleCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::NotStarted.as_u8()))
    }

    pub fn current(&self) -> LifecycleState {
        Self::decode(self.0.load(Ordering::Acquire))
    }

    fn decode(raw: u8) -> LifecycleState {
        // Only `advance` writes, and it only writes valid states.
        LifecycleState::from_u8(raw).unwrap_or(LifecycleState::Resolved)
    }

    /// Move to `to`, returning the state it replaced.
    pub fn advance(&self, to: LifecycleState) -> launcher_core::Result<LifecycleState> {
        let mut raw = self.0.load(Ordering::Acquire);
        loop {
            let from = Self::decode(raw);
            LifecycleStateMachine::validate_transition(from, to)?;
            match self
                .0
                .compare_exchange(raw, to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(from),
                Err(actual) => raw = actual,
            }
        }
    }
}

impl Default for LifecycleCell {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared between the awaiting call and the host's listeners.
struct LaunchShared {
    launch_id: Uuid,
    state: LifecycleCell,
    signal: CompletionSignal<Result<bool>>,
    events: EventBus,
}

impl LaunchShared {
    fn advance(&self, to: LifecycleState) {
        match self.state.advance(to) {
            Ok(from) => {
                debug!(launch_id = %self.launch_id, from = %from, to = %to, "Launch state advanced");
                self.events.emit(Event::StateChanged {
                    launch_id: self.launch_id,
                    from_state: from.as_str().to_string(),
                    to_state: to.as_str().to_string(),
                });
            }
            Err(e) => {
                warn!(launch_id = %self.launch_id, error = %e, "Ignoring lifecycle regression");
            }
        }
    }
}

/// Listeners one launch registered. Dropping it removes them, so a host
/// event arriving after the caller stopped waiting reaches nobody.
struct Registration {
    host: Arc<dyn RuntimeHost>,
    creation: ListenerId,
    ready: ListenerId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let lifecycle = self.host.lifecycle();
        lifecycle.delegate_will_be_created().remove(self.creation);
        lifecycle.context_initialized().remove(self.ready);
    }
}

/// Drives a single launch attempt against a host.
///
/// Consumed by [`LaunchCoordinator::await_launch`]; a new attempt needs a
/// new coordinator.
pub struct LaunchCoordinator {
    launch_id: Uuid,
    host: Arc<dyn RuntimeHost>,
    dev_menu: Arc<DevMenuRegistry>,
    events: EventBus,
    policy: LaunchPolicy,
}

impl LaunchCoordinator {
    pub fn new(launch_id: Uuid, config: &LoaderConfig) -> Self {
        Self {
            launch_id,
            host: Arc::clone(config.host()),
            dev_menu: Arc::clone(config.dev_menu()),
            events: config.events().clone(),
            policy: config.policy(),
        }
    }

    pub fn launch_id(&self) -> Uuid {
        self.launch_id
    }

    /// Start an instance and wait until its runtime context is ready.
    ///
    /// `pre_create` runs on the host thread when the instance's delegate is
    /// about to be built; `post_ready` runs when the context is ready and
    /// before this future completes. Resolves `Ok(true)` on readiness and
    /// never `Ok(false)`: without a timeout policy a host that never gets
    /// ready keeps the call pending.
    ///
    /// Fails with [`LaunchError::ContextAlreadyActive`] without calling
    /// `start` if the host already has a runtime context.
    pub async fn await_launch<S, P, R>(self, start: S, pre_create: P, post_ready: R) -> Result<bool>
    where
        S: FnOnce(),
        P: Fn(&ActivityHandle) + Send + Sync + 'static,
        R: Fn(&RuntimeContext) + Send + Sync + 'static,
    {
        if let Some(existing) = self.host.current_context() {
            error!(
                launch_id = %self.launch_id,
                context_id = %existing.id(),
                "Runtime context exists before launch; refusing to start"
            );
            return Err(LaunchError::ContextAlreadyActive {
                context_id: existing.id(),
            });
        }

        let (signal, receiver) = CompletionSignal::new();
        let shared = Arc::new(LaunchShared {
            launch_id: self.launch_id,
            state: LifecycleCell::new(),
            signal,
            events: self.events.clone(),
        });

        let _registration = Registration {
            host: Arc::clone(&self.host),
            creation: self.register_creation_listener(&shared, pre_create),
            ready: self.register_ready_listener(&shared, post_ready),
        };

        shared.advance(LifecycleState::InstanceStarting);
        info!(launch_id = %self.launch_id, "Starting instance");
        start();

        let outcome = match self.policy.timeout {
            None => receiver.await,
            Some(timeout) => match tokio::time::timeout(timeout, receiver).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                    warn!(launch_id = %self.launch_id, timeout_ms, "Launch timed out");
                    // Settle the signal so a late host event is a no-op.
                    shared.signal.resolve(Err(LaunchError::TimedOut { timeout_ms }));
                    return Err(LaunchError::TimedOut { timeout_ms });
                }
            },
        };

        // `shared` owns the sender until it has sent, so the channel cannot
        // close empty while we wait on it.
        let Ok(result) = outcome else {
            unreachable!("launch signal dropped while its owner is alive");
        };
        debug!(
            launch_id = %self.launch_id,
            state = %shared.state.current(),
            ok = result.is_ok(),
            "Launch settled"
        );
        result
    }

    /// The precondition is re-checked before `pre_create` runs, so a launch
    /// that finds a live context never runs variant hooks.
    fn register_creation_listener<P>(&self, shared: &Arc<LaunchShared>, pre_create: P) -> ListenerId
    where
        P: Fn(&ActivityHandle) + Send + Sync + 'static,
    {
        let slot: Arc<OnceLock<ListenerId>> = Arc::default();
        let fired = AtomicBool::new(false);
        let host = Arc::downgrade(&self.host);
        let shared = Arc::clone(shared);
        let own_id = Arc::clone(&slot);

        let id = self
            .host
            .lifecycle()
            .delegate_will_be_created()
            .register(move |activity: &ActivityHandle| {
                if fired.swap(true, Ordering::AcqRel) || shared.signal.is_resolved() {
                    return;
                }
                let Some(host) = host.upgrade() else {
                    return;
                };
                if let Some(id) = own_id.get() {
                    host.lifecycle().delegate_will_be_created().remove(*id);
                }

                if let Some(existing) = host.current_context() {
                    error!(
                        launch_id = %shared.launch_id,
                        context_id = %existing.id(),
                        "Runtime context created before the launch delegate"
                    );
                    shared.signal.resolve(Err(LaunchError::ContextAlreadyActive {
                        context_id: existing.id(),
                    }));
                    return;
                }

                pre_create(activity);
                shared.advance(LifecycleState::PreCreateHookFired);
            });
        let _ = slot.set(id);
        id
    }

    fn register_ready_listener<R>(&self, shared: &Arc<LaunchShared>, post_ready: R) -> ListenerId
    where
        R: Fn(&RuntimeContext) + Send + Sync + 'static,
    {
        let slot: Arc<OnceLock<ListenerId>> = Arc::default();
        let fired = AtomicBool::new(false);
        let host = Arc::downgrade(&self.host);
        let dev_menu = Arc::clone(&self.dev_menu);
        let shared = Arc::clone(shared);
        let own_id = Arc::clone(&slot);

        let id = self
            .host
            .lifecycle()
            .context_initialized()
            .register(move |context: &RuntimeContext| {
                if fired.swap(true, Ordering::AcqRel) {
                    trace!(launch_id = %shared.launch_id, "Duplicate context event ignored");
                    return;
                }
                if let (Some(host), Some(id)) = (host.upgrade(), own_id.get()) {
                    host.lifecycle().context_initialized().remove(*id);
                }
                if shared.signal.is_resolved() {
                    debug!(launch_id = %shared.launch_id, "Launch already settled; context ignored");
                    return;
                }

                shared.advance(LifecycleState::ContextReady);
                dev_menu.maybe_init(context);
                post_ready(context);
                shared.events.emit(Event::ContextReady {
                    launch_id: shared.launch_id,
                    context_id: context.id(),
                });
                shared.advance(LifecycleState::Resolved);
                shared.signal.resolve(Ok(true));
            });
        let _ = slot.set(id);
        id
    }
}
