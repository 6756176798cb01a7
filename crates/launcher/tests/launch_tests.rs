use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use events::{Event, EventBus};
use launcher::loaders::properties;
use launcher::{
    AppContext, AppLoader, DebugServerTarget, DevMenuRegistry, DevelopmentBuildLoader,
    HostLifecycle, LaunchError, LaunchPolicy, Launcher, LoaderConfig, ReactNativeLoader,
    RuntimeHost, SimulatedHost, SimulatedHostOptions,
};
use launcher_core::{
    ActivityHandle, AppManifest, BundleLocation, LaunchRequest, Orientation, RuntimeContext,
};
use serde_json::json;

#[derive(Default)]
struct HookLog {
    entries: Mutex<Vec<&'static str>>,
    before_creation: AtomicUsize,
    create: AtomicUsize,
    context_ready: AtomicUsize,
}

impl HookLog {
    fn push(&self, entry: &'static str) {
        self.entries.lock().unwrap().push(entry);
    }

    fn entries(&self) -> Vec<&'static str> {
        self.entries.lock().unwrap().clone()
    }
}

struct RecordingLoader {
    url: String,
    log: Arc<HookLog>,
}

impl RecordingLoader {
    fn new(url: &str) -> (Self, Arc<HookLog>) {
        let log = Arc::new(HookLog::default());
        (
            Self {
                url: url.to_string(),
                log: log.clone(),
            },
            log,
        )
    }
}

#[async_trait]
impl AppLoader for RecordingLoader {
    async fn bundle_location(&self) -> launcher::Result<BundleLocation> {
        Ok(BundleLocation::parse(&self.url)?)
    }

    fn on_before_creation(&self, _activity: &ActivityHandle) {
        self.log.before_creation.fetch_add(1, Ordering::SeqCst);
        self.log.push("before_creation");
    }

    fn on_create(&self, _activity: &ActivityHandle) {
        self.log.create.fetch_add(1, Ordering::SeqCst);
        self.log.push("create");
    }

    fn on_context_ready(&self, _context: &RuntimeContext) {
        self.log.context_ready.fetch_add(1, Ordering::SeqCst);
        self.log.push("context_ready");
    }
}

fn config_for(host: &SimulatedHost) -> LoaderConfig {
    LoaderConfig::new(Arc::new(host.clone()), Arc::new(host.clone()))
}

fn request() -> LaunchRequest {
    LaunchRequest::new("MainActivity").with_flag("new_task")
}

#[tokio::test]
async fn launch_resolves_true_after_context_ready() {
    let host = SimulatedHost::new(SimulatedHostOptions {
        ready_delay: Duration::from_millis(20),
        ..Default::default()
    });
    let dev_menu = Arc::new(DevMenuRegistry::new());
    let (loader, log) = RecordingLoader::new("http://localhost:8081/index.bundle");
    let launcher = Launcher::new(loader, config_for(&host).with_dev_menu(dev_menu.clone()));

    let launched = launcher.launch(request()).await.unwrap();

    assert!(launched);
    assert_eq!(log.before_creation.load(Ordering::SeqCst), 1);
    assert_eq!(log.create.load(Ordering::SeqCst), 1);
    assert_eq!(log.context_ready.load(Ordering::SeqCst), 1);
    assert_eq!(log.entries(), vec!["before_creation", "create", "context_ready"]);

    let target = host.debug_server().unwrap();
    assert_eq!(target.host, "localhost:8081");
    assert_eq!(target.bundle_name, "index");

    assert_eq!(host.start_count(), 1);
    let context = host.current_context().unwrap();
    assert!(dev_menu.is_initialized(&context));
    assert_eq!(host.lifecycle().listener_count(), 0);
}

#[tokio::test]
async fn rewrite_failure_returns_false_without_starting() {
    let host = SimulatedHost::default();
    let (loader, log) = RecordingLoader::new("http://localhost:8081/index.bundle");
    let config = config_for(&host).with_rewriter(Arc::new(
        |_: &dyn AppContext, _: &dyn RuntimeHost, _: &str, _: &str| false,
    ));

    let launched = Launcher::new(loader, config).launch(request()).await.unwrap();

    assert!(!launched);
    assert_eq!(host.start_count(), 0);
    assert_eq!(host.lifecycle().listener_count(), 0);
    assert_eq!(log.before_creation.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn host_refusing_debug_server_returns_false() {
    let host = SimulatedHost::new(SimulatedHostOptions {
        reject_debug_server: true,
        ..Default::default()
    });
    let launcher = Launcher::new(
        ReactNativeLoader::new("http://localhost:8081/index.bundle"),
        config_for(&host),
    );

    assert!(!launcher.launch(request()).await.unwrap());
    assert_eq!(host.start_count(), 0);
}

#[tokio::test]
async fn existing_context_is_fatal() {
    let host = SimulatedHost::with_running_context(SimulatedHostOptions::default());
    let (loader, log) = RecordingLoader::new("http://localhost:8081/index.bundle");

    let result = Launcher::new(loader, config_for(&host)).launch(request()).await;

    match result {
        Err(e @ LaunchError::ContextAlreadyActive { .. }) => assert!(e.is_fatal()),
        other => panic!("expected fatal precondition violation, got {other:?}"),
    }
    assert_eq!(host.start_count(), 0);
    assert_eq!(log.before_creation.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn second_launch_against_same_host_is_refused() {
    let host = SimulatedHost::default();
    let url = "http://localhost:8081/index.bundle";

    let first = Launcher::new(ReactNativeLoader::new(url), config_for(&host));
    assert!(first.launch(request()).await.unwrap());

    let second = Launcher::new(ReactNativeLoader::new(url), config_for(&host));
    let result = second.launch(request()).await;

    assert!(matches!(result, Err(LaunchError::ContextAlreadyActive { .. })));
    assert_eq!(host.start_count(), 1);
}

#[tokio::test]
async fn duplicate_context_events_resolve_once() {
    let host = SimulatedHost::new(SimulatedHostOptions {
        ready_events: 3,
        ..Default::default()
    });
    let dev_menu = Arc::new(DevMenuRegistry::new());
    let (loader, log) = RecordingLoader::new("http://localhost:8081/index.bundle");
    let config = config_for(&host).with_dev_menu(dev_menu.clone());

    assert!(Launcher::new(loader, config).launch(request()).await.unwrap());
    host.join();
    assert!(host.reload());

    assert_eq!(log.context_ready.load(Ordering::SeqCst), 1);
    assert_eq!(dev_menu.initialized_count(), 1);
}

#[tokio::test]
async fn context_ready_hook_runs_before_launch_returns() {
    struct FlagLoader {
        ready: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AppLoader for FlagLoader {
        async fn bundle_location(&self) -> launcher::Result<BundleLocation> {
            Ok(BundleLocation::parse("http://localhost:8081/main.bundle")?)
        }

        fn on_context_ready(&self, context: &RuntimeContext) {
            std::thread::sleep(Duration::from_millis(30));
            context.set_property("hook", "done");
            self.ready.fetch_add(1, Ordering::SeqCst);
        }
    }

    let host = SimulatedHost::new(SimulatedHostOptions {
        ready_delay: Duration::from_millis(10),
        ..Default::default()
    });
    let ready = Arc::new(AtomicUsize::new(0));
    let launcher = Launcher::new(FlagLoader { ready: ready.clone() }, config_for(&host));

    assert!(launcher.launch(request()).await.unwrap());

    assert_eq!(ready.load(Ordering::SeqCst), 1);
    let context = host.current_context().unwrap();
    assert_eq!(context.property("hook"), Some(json!("done")));
    assert_eq!(host.debug_server().unwrap().bundle_name, "main");
}

#[tokio::test]
async fn timeout_policy_tolerates_late_context() {
    let host = SimulatedHost::new(SimulatedHostOptions {
        ready_delay: Duration::from_millis(150),
        ..Default::default()
    });
    let (loader, log) = RecordingLoader::new("http://localhost:8081/index.bundle");
    let config =
        config_for(&host).with_policy(LaunchPolicy::with_timeout(Duration::from_millis(20)));

    let result = Launcher::new(loader, config).launch(request()).await;
    assert!(matches!(result, Err(LaunchError::TimedOut { timeout_ms: 20 })));

    // The host finishes starting after the caller gave up.
    host.join();
    assert!(host.current_context().is_some());
    assert_eq!(log.context_ready.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dropped_launch_reports_failure() {
    let host = SimulatedHost::new(SimulatedHostOptions {
        hang_before_ready: true,
        ..Default::default()
    });
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let launcher = Launcher::new(
        ReactNativeLoader::new("http://localhost:8081/index.bundle"),
        config_for(&host).with_events(bus.clone()),
    );

    let outcome = tokio::time::timeout(Duration::from_millis(50), launcher.launch(request())).await;
    assert!(outcome.is_err());

    let mut resolved = None;
    while let Ok(envelope) = rx.try_recv() {
        if let Event::LaunchResolved { success, .. } = envelope.event {
            resolved = Some(success);
        }
    }
    assert_eq!(resolved, Some(false));
}

#[tokio::test]
async fn events_follow_lifecycle_order() {
    let host = SimulatedHost::default();
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let launcher = Launcher::new(
        ReactNativeLoader::new("http://localhost:8081/index.bundle"),
        config_for(&host).with_events(bus.clone()),
    );

    assert!(launcher.launch(request()).await.unwrap());

    let mut kinds = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        let kind = match envelope.event {
            Event::LaunchStarted { .. } => "started".to_string(),
            Event::DebugHostRewritten { success, .. } => format!("debug_host:{success}"),
            Event::StateChanged { to_state, .. } => to_state,
            Event::ContextReady { .. } => "context".to_string(),
            Event::LaunchResolved { success, .. } => format!("resolved:{success}"),
            Event::LaunchFailed { message, .. } => format!("failed:{message}"),
        };
        kinds.push(kind);
    }

    assert_eq!(
        kinds,
        vec![
            "started",
            "debug_host:true",
            "instance_starting",
            "pre_create_hook_fired",
            "context_ready",
            "context",
            "resolved",
            "resolved:true",
        ]
    );
}

#[tokio::test]
async fn development_build_configures_activity_and_context() {
    let host = SimulatedHost::default();
    let mut manifest = AppManifest::new(
        "Demo",
        BundleLocation::parse("http://192.168.1.4:8081/apps/demo.bundle").unwrap(),
    );
    manifest.orientation = Orientation::Portrait;

    let launcher = Launcher::new(DevelopmentBuildLoader::from_manifest(manifest), config_for(&host));
    assert_eq!(launcher.loader().bundle_name().as_deref(), Some("Demo"));

    assert!(launcher.launch(request()).await.unwrap());

    let target = host.debug_server().unwrap();
    assert_eq!(target.host, "192.168.1.4:8081");
    assert_eq!(target.bundle_name, "apps/demo");

    host.join();
    let activity = host.activities().pop().unwrap();
    assert_eq!(activity.property(properties::TASK_DESCRIPTION), Some(json!("Demo")));
    assert_eq!(activity.property(properties::ORIENTATION), Some(json!("portrait")));

    let context = host.current_context().unwrap();
    assert_eq!(context.property(properties::MANIFEST).unwrap()["name"], "Demo");
}

#[tokio::test]
async fn unresolvable_bundle_aborts_before_start() {
    let host = SimulatedHost::default();
    let launcher = Launcher::new(
        DevelopmentBuildLoader::from_path("/nonexistent/manifest.json"),
        config_for(&host),
    );

    let result = launcher.launch(request()).await;

    assert!(matches!(result, Err(LaunchError::BundleResolution(_))));
    assert_eq!(host.start_count(), 0);
    assert!(host.debug_server().is_none());
}

/// Host that begins building the delegate and then stalls before the
/// activity is created.
#[derive(Default)]
struct StalledHost {
    lifecycle: HostLifecycle,
}

impl RuntimeHost for StalledHost {
    fn current_context(&self) -> Option<RuntimeContext> {
        None
    }

    fn lifecycle(&self) -> &HostLifecycle {
        &self.lifecycle
    }

    fn apply_debug_server(&self, _target: DebugServerTarget) -> bool {
        true
    }
}

impl AppContext for StalledHost {
    fn start_activity(&self, request: LaunchRequest) {
        self.lifecycle
            .delegate_will_be_created()
            .emit(&ActivityHandle::new(request.activity));
    }
}

#[tokio::test]
async fn timed_out_launch_releases_on_create_listener() {
    let host = Arc::new(StalledHost::default());
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let (loader, log) = RecordingLoader::new("http://localhost:8081/index.bundle");
    let config = LoaderConfig::new(host.clone(), host.clone())
        .with_events(bus.clone())
        .with_policy(LaunchPolicy::with_timeout(Duration::from_millis(20)));

    let result = Launcher::new(loader, config).launch(request()).await;

    assert!(matches!(result, Err(LaunchError::TimedOut { timeout_ms: 20 })));
    assert_eq!(log.before_creation.load(Ordering::SeqCst), 1);
    assert_eq!(host.lifecycle().listener_count(), 0);
    // Nothing on the host still holds the loader.
    assert_eq!(Arc::strong_count(&log), 1);

    host.lifecycle()
        .activity_created()
        .emit(&ActivityHandle::new("MainActivity"));
    assert_eq!(log.create.load(Ordering::SeqCst), 0);

    let mut failure = None;
    while let Ok(envelope) = rx.try_recv() {
        if let Event::LaunchFailed { message, .. } = envelope.event {
            failure = Some(message);
        }
    }
    assert_eq!(failure.as_deref(), Some("Launch timed out after 20ms"));
}

#[tokio::test]
async fn dropped_launch_releases_on_create_listener() {
    let host = Arc::new(StalledHost::default());
    let (loader, log) = RecordingLoader::new("http://localhost:8081/index.bundle");
    let launcher = Launcher::new(loader, LoaderConfig::new(host.clone(), host.clone()));

    let outcome = tokio::time::timeout(Duration::from_millis(20), launcher.launch(request())).await;

    assert!(outcome.is_err());
    assert_eq!(log.before_creation.load(Ordering::SeqCst), 1);
    assert_eq!(host.lifecycle().listener_count(), 0);
    assert_eq!(Arc::strong_count(&log), 1);
}
