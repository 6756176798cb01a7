//! In-process host that plays back a startup sequence.
//!
//! Each started activity gets its own dispatch thread which fires the
//! lifecycle events in host order, so listeners run off the caller's thread
//! the same way they do against a real host.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use launcher_core::{ActivityHandle, LaunchRequest, RuntimeContext};
use tracing::{debug, info};

use crate::host::{AppContext, DebugServerTarget, HostLifecycle, RuntimeHost};

/// Timing and failure knobs for [`SimulatedHost`].
#[derive(Debug, Clone)]
pub struct SimulatedHostOptions {
    /// Delay before the activity is constructed
    pub creation_delay: Duration,
    /// Delay between activity creation and the context becoming ready
    pub ready_delay: Duration,
    /// How many times "context initialized" is fired
    pub ready_events: usize,
    /// Never report readiness, like a bundle that hangs on startup
    pub hang_before_ready: bool,
    /// Refuse debug server targets
    pub reject_debug_server: bool,
}

impl Default for SimulatedHostOptions {
    fn default() -> Self {
        Self {
            creation_delay: Duration::ZERO,
            ready_delay: Duration::ZERO,
            ready_events: 1,
            hang_before_ready: false,
            reject_debug_server: false,
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    context: Option<RuntimeContext>,
    debug_server: Option<DebugServerTarget>,
    activities: Vec<ActivityHandle>,
    dispatchers: Vec<thread::JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    options: SimulatedHostOptions,
    lifecycle: HostLifecycle,
    state: Mutex<HostState>,
    started: AtomicUsize,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, request: &LaunchRequest) {
        thread::sleep(self.options.creation_delay);

        let activity = ActivityHandle::new(request.activity.clone());
        for (key, value) in &request.extras {
            activity.set_property(key.clone(), value.clone());
        }
        debug!(activity_id = %activity.id(), name = %activity.name(), "Constructing activity");
        self.lifecycle.delegate_will_be_created().emit(&activity);
        self.lifecycle.activity_created().emit(&activity);
        self.state().activities.push(activity);

        if self.options.hang_before_ready {
            debug!("Simulated host hangs before the context is ready");
            return;
        }

        thread::sleep(self.options.ready_delay);
        let context = RuntimeContext::new();
        self.state().context = Some(context.clone());
        for _ in 0..self.options.ready_events {
            self.lifecycle.context_initialized().emit(&context);
        }
    }
}

/// Host and execution context in one, for the CLI and tests.
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    inner: Arc<Inner>,
}

impl SimulatedHost {
    pub fn new(options: SimulatedHostOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                lifecycle: HostLifecycle::new(),
                state: Mutex::new(HostState::default()),
                started: AtomicUsize::new(0),
            }),
        }
    }

    /// Host that already runs an instance.
    pub fn with_running_context(options: SimulatedHostOptions) -> Self {
        let host = Self::new(options);
        host.inner.state().context = Some(RuntimeContext::new());
        host
    }

    pub fn options(&self) -> &SimulatedHostOptions {
        &self.inner.options
    }

    /// Number of `start_activity` calls received.
    pub fn start_count(&self) -> usize {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn debug_server(&self) -> Option<DebugServerTarget> {
        self.inner.state().debug_server.clone()
    }

    pub fn activities(&self) -> Vec<ActivityHandle> {
        self.inner.state().activities.clone()
    }

    /// Fire "context initialized" again for the current context, as a host
    /// does on reload.
    pub fn reload(&self) -> bool {
        let context = self.inner.state().context.clone();
        match context {
            Some(context) => {
                self.inner.lifecycle.context_initialized().emit(&context);
                true
            }
            None => false,
        }
    }

    /// Wait for every dispatch thread started so far.
    pub fn join(&self) {
        let dispatchers = std::mem::take(&mut self.inner.state().dispatchers);
        for dispatcher in dispatchers {
            let _ = dispatcher.join();
        }
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new(SimulatedHostOptions::default())
    }
}

impl RuntimeHost for SimulatedHost {
    fn current_context(&self) -> Option<RuntimeContext> {
        self.inner.state().context.clone()
    }

    fn lifecycle(&self) -> &HostLifecycle {
        &self.inner.lifecycle
    }

    fn apply_debug_server(&self, target: DebugServerTarget) -> bool {
        if self.inner.options.reject_debug_server {
            return false;
        }
        self.inner.state().debug_server = Some(target);
        true
    }
}

impl AppContext for SimulatedHost {
    fn start_activity(&self, request: LaunchRequest) {
        let run = self.inner.started.fetch_add(1, Ordering::SeqCst) + 1;
        info!(activity = %request.activity, run, "Simulated host starting activity");

        let inner = Arc::clone(&self.inner);
        let dispatcher = thread::Builder::new()
            .name(format!("sim-host-{run}"))
            .spawn(move || inner.dispatch(&request));

        match dispatcher {
            Ok(handle) => {
                let mut state = self.inner.state();
                state.dispatchers.retain(|running| !running.is_finished());
                state.dispatchers.push(handle);
            }
            Err(e) => tracing::error!(error = %e, "Could not spawn simulated host thread"),
        }
    }
}
