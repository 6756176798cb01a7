//! Seams to the external host environment.
//!
//! The host owns the actual runtime. The launcher only sees it through
//! these traits: something that starts instances, something that reports
//! lifecycle events, and something that points the runtime at a debug
//! server.

use events::ListenerRegistry;
use launcher_core::{ActivityHandle, LaunchRequest, RuntimeContext};
use tracing::{debug, warn};

/// Lifecycle callbacks a host emits while an instance starts up, in the
/// order a well-behaved host fires them.
#[derive(Debug, Default)]
pub struct HostLifecycle {
    delegate_will_be_created: ListenerRegistry<ActivityHandle>,
    activity_created: ListenerRegistry<ActivityHandle>,
    context_initialized: ListenerRegistry<RuntimeContext>,
}

impl HostLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fired from the activity constructor, before the runtime delegate
    /// object exists.
    pub fn delegate_will_be_created(&self) -> &ListenerRegistry<ActivityHandle> {
        &self.delegate_will_be_created
    }

    /// Fired after the host's own creation hook, before the runtime
    /// delegate's creation hook.
    pub fn activity_created(&self) -> &ListenerRegistry<ActivityHandle> {
        &self.activity_created
    }

    /// Fired once the runtime context is fully initialized. Hosts may
    /// repeat it (reloads); listeners must tolerate duplicates.
    pub fn context_initialized(&self) -> &ListenerRegistry<RuntimeContext> {
        &self.context_initialized
    }

    pub fn listener_count(&self) -> usize {
        self.delegate_will_be_created.len()
            + self.activity_created.len()
            + self.context_initialized.len()
    }
}

/// Debug server the runtime should load bundles from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugServerTarget {
    pub host: String,
    pub bundle_name: String,
}

/// Handle to the runtime a loader launches into.
pub trait RuntimeHost: Send + Sync {
    /// Context of an instance that is already running, if any.
    fn current_context(&self) -> Option<RuntimeContext>;

    fn lifecycle(&self) -> &HostLifecycle;

    /// Store the debug server target. Returns `false` if the host refused it.
    fn apply_debug_server(&self, target: DebugServerTarget) -> bool;
}

/// Ambient execution context used to start instances.
pub trait AppContext: Send + Sync {
    /// Ask the host to open `request`. Returns immediately; progress is only
    /// observable through [`HostLifecycle`] events.
    fn start_activity(&self, request: LaunchRequest);
}

/// Points the runtime at a debug server before launch.
pub trait DebugHostRewriter: Send + Sync {
    fn rewrite(
        &self,
        context: &dyn AppContext,
        host: &dyn RuntimeHost,
        debug_host: &str,
        bundle_name: &str,
    ) -> bool;
}

impl<F> DebugHostRewriter for F
where
    F: Fn(&dyn AppContext, &dyn RuntimeHost, &str, &str) -> bool + Send + Sync,
{
    fn rewrite(
        &self,
        context: &dyn AppContext,
        host: &dyn RuntimeHost,
        debug_host: &str,
        bundle_name: &str,
    ) -> bool {
        self(context, host, debug_host, bundle_name)
    }
}

/// Default rewriter: validates the descriptor and hands it to the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSettingsRewriter;

impl HostSettingsRewriter {
    fn is_valid_host(debug_host: &str) -> bool {
        match debug_host.rsplit_once(':') {
            Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
            None => !debug_host.is_empty(),
        }
    }
}

impl DebugHostRewriter for HostSettingsRewriter {
    fn rewrite(
        &self,
        _context: &dyn AppContext,
        host: &dyn RuntimeHost,
        debug_host: &str,
        bundle_name: &str,
    ) -> bool {
        if !Self::is_valid_host(debug_host) || bundle_name.is_empty() {
            warn!(debug_host, bundle_name, "Refusing malformed debug server target");
            return false;
        }

        let applied = host.apply_debug_server(DebugServerTarget {
            host: debug_host.to_string(),
            bundle_name: bundle_name.to_string(),
        });
        debug!(debug_host, bundle_name, applied, "Debug server target rewritten");
        applied
    }
}
