use std::sync::Arc;
use std::time::Duration;

use events::EventBus;

use crate::dev_menu::DevMenuRegistry;
use crate::host::{AppContext, DebugHostRewriter, HostSettingsRewriter, RuntimeHost};

/// How long a launch may stay pending.
///
/// The default waits forever, the same way the host's own startup has no
/// bound. A bounded policy turns a hung host into `LaunchError::TimedOut`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchPolicy {
    pub timeout: Option<Duration>,
}

impl LaunchPolicy {
    pub fn unbounded() -> Self {
        Self { timeout: None }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Everything a loader needs from its surroundings.
///
/// Built once per loader and never changed afterwards; the `with_*`
/// methods consume the config so they can only be used while building it.
#[derive(Clone)]
pub struct LoaderConfig {
    host: Arc<dyn RuntimeHost>,
    context: Arc<dyn AppContext>,
    rewriter: Arc<dyn DebugHostRewriter>,
    dev_menu: Arc<DevMenuRegistry>,
    events: EventBus,
    policy: LaunchPolicy,
}

impl LoaderConfig {
    pub fn new(host: Arc<dyn RuntimeHost>, context: Arc<dyn AppContext>) -> Self {
        Self {
            host,
            context,
            rewriter: Arc::new(HostSettingsRewriter),
            dev_menu: Arc::new(DevMenuRegistry::new()),
            events: EventBus::new(),
            policy: LaunchPolicy::default(),
        }
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn DebugHostRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    /// Share one registry between every loader in the process.
    pub fn with_dev_menu(mut self, dev_menu: Arc<DevMenuRegistry>) -> Self {
        self.dev_menu = dev_menu;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_policy(mut self, policy: LaunchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn host(&self) -> &Arc<dyn RuntimeHost> {
        &self.host
    }

    pub fn context(&self) -> &Arc<dyn AppContext> {
        &self.context
    }

    pub fn rewriter(&self) -> &Arc<dyn DebugHostRewriter> {
        &self.rewriter
    }

    pub fn dev_menu(&self) -> &Arc<DevMenuRegistry> {
        &self.dev_menu
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn policy(&self) -> LaunchPolicy {
        self.policy
    }
}

impl std::fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("dev_menu", &self.dev_menu)
            .field("events", &self.events)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
