//! Loader contract and the launch sequence built on it.
//!
//! A loader variant supplies the bundle location and may hook into three
//! points of the host lifecycle:
//!
//! - `on_before_creation` - before the runtime delegate is constructed
//! - `on_create` - after the host's creation hook, before the delegate's
//! - `on_context_ready` - after the runtime context is initialized
//!
//! [`Launcher`] runs one launch for a variant: resolve the bundle, point the
//! runtime at its debug server, then start the instance and wait for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use events::{Event, ListenerId};
use launcher_core::{ActivityHandle, BundleLocation, LaunchRequest, RuntimeContext};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LoaderConfig;
use crate::coordinator::LaunchCoordinator;
use crate::error::{LaunchError, Result};
use crate::host::RuntimeHost;
use crate::resources::LaunchGuard;

/// Capabilities of a loader variant. Every hook defaults to doing nothing.
#[async_trait]
pub trait AppLoader: Send + Sync + 'static {
    /// Location of the bundle to run. Failing here aborts the launch before
    /// anything is started.
    async fn bundle_location(&self) -> Result<BundleLocation>;

    /// Runs on the host thread before the runtime delegate exists.
    fn on_before_creation(&self, _activity: &ActivityHandle) {}

    /// Runs once after the host's activity-created event.
    fn on_create(&self, _activity: &ActivityHandle) {}

    /// Runs once the runtime context is ready, before the launch resolves.
    fn on_context_ready(&self, _context: &RuntimeContext) {}

    /// Display name of the launched app, if the variant knows one.
    fn bundle_name(&self) -> Option<String> {
        None
    }
}

/// Runs a single launch for a loader variant.
///
/// [`Launcher::launch`] consumes the launcher; launching again means
/// building a new one.
pub struct Launcher<L> {
    loader: Arc<L>,
    config: LoaderConfig,
}

impl<L: AppLoader> Launcher<L> {
    pub fn new(loader: L, config: LoaderConfig) -> Self {
        Self {
            loader: Arc::new(loader),
            config,
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Launch `request` and wait for the runtime context to become ready.
    ///
    /// Returns `Ok(false)` if the debug server could not be configured (no
    /// instance is started in that case) and `Ok(true)` once the context is
    /// ready and every hook has run.
    pub async fn launch(self, request: LaunchRequest) -> Result<bool> {
        let launch_id = Uuid::new_v4();
        let location = self.loader.bundle_location().await?;

        let events = self.config.events().clone();
        let mut guard = LaunchGuard::new(launch_id, Some(events.clone()));
        events.emit(Event::LaunchStarted {
            launch_id,
            bundle_url: location.to_string(),
        });
        info!(
            launch_id = %launch_id,
            bundle_url = %location,
            app_name = ?self.loader.bundle_name(),
            activity = %request.activity,
            "Launching app"
        );

        if !self.set_app_url(launch_id, &location) {
            warn!(launch_id = %launch_id, "Debug server rewrite failed; instance not started");
            guard.mark_resolved(false);
            return Ok(false);
        }

        let coordinator = LaunchCoordinator::new(launch_id, &self.config);
        let context = Arc::clone(self.config.context());
        let host = Arc::downgrade(self.config.host());
        let before_creation = Arc::clone(&self.loader);
        let context_ready = Arc::clone(&self.loader);
        let on_create = CreateListener::new(Arc::clone(self.config.host()));
        let on_create_slot = Arc::clone(&on_create.id);

        let result = coordinator
            .await_launch(
                move || context.start_activity(request),
                move |activity: &ActivityHandle| {
                    before_creation.on_before_creation(activity);
                    if let Some(host) = host.upgrade() {
                        observe_activity_created(
                            &host,
                            activity,
                            Arc::clone(&before_creation),
                            Arc::clone(&on_create_slot),
                        );
                    }
                },
                move |runtime: &RuntimeContext| context_ready.on_context_ready(runtime),
            )
            .await;

        drop(on_create);
        match &result {
            Ok(success) => guard.mark_resolved(*success),
            Err(e) => guard.mark_failed(&e.to_string()),
        }
        result
    }

    fn set_app_url(&self, launch_id: Uuid, location: &BundleLocation) -> bool {
        let debug_host = location.debug_server_host();
        let bundle_name = location.bundle_name();

        let success = self.config.rewriter().rewrite(
            self.config.context().as_ref(),
            self.config.host().as_ref(),
            &debug_host,
            &bundle_name,
        );

        self.config.events().emit(Event::DebugHostRewritten {
            launch_id,
            debug_host,
            bundle_name,
            success,
        });
        success
    }
}

/// Resolve a bundle URL string, mapping parse failures to
/// [`LaunchError::BundleResolution`].
pub fn parse_bundle_location(url: &str) -> Result<BundleLocation> {
    BundleLocation::parse(url).map_err(|e| LaunchError::bundle_resolution(e.to_string()))
}

/// The `on_create` listener of one launch. Dropping it removes the listener
/// if the host never reached activity creation.
struct CreateListener {
    host: Arc<dyn RuntimeHost>,
    id: Arc<OnceLock<ListenerId>>,
}

impl CreateListener {
    fn new(host: Arc<dyn RuntimeHost>) -> Self {
        Self {
            host,
            id: Arc::default(),
        }
    }
}

impl Drop for CreateListener {
    fn drop(&mut self) {
        if let Some(id) = self.id.get() {
            if self.host.lifecycle().activity_created().remove(*id) {
                debug!(listener = %id, "Activity never created; on_create listener removed");
            }
        }
    }
}

/// Run `loader.on_create` for the first activity-created event of
/// `activity`, then stop listening. The listener id is stored in `slot`.
fn observe_activity_created<L: AppLoader>(
    host: &Arc<dyn RuntimeHost>,
    activity: &ActivityHandle,
    loader: Arc<L>,
    slot: Arc<OnceLock<ListenerId>>,
) {
    let fired = AtomicBool::new(false);
    let weak_host = Arc::downgrade(host);
    let own_id = Arc::clone(&slot);
    let target = activity.id();

    let id = host
        .lifecycle()
        .activity_created()
        .register(move |created: &ActivityHandle| {
            if created.id() != target || fired.swap(true, Ordering::AcqRel) {
                return;
            }
            if let (Some(host), Some(id)) = (weak_host.upgrade(), own_id.get()) {
                host.lifecycle().activity_created().remove(*id);
            }
            debug!(activity_id = %target, "Activity created");
            loader.on_create(created);
        });
    let _ = slot.set(id);
}
