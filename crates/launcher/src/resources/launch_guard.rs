//! RAII guard that reports how a launch ended.
//!
//! A caller may impose its own timeout by dropping the launch future. The
//! guard then still tells observers the launch failed.

use tracing::{debug, warn};
use uuid::Uuid;

use events::{Event, EventBus};

/// Publishes a single `LaunchResolved` event for one launch.
///
/// Dropped without [`LaunchGuard::mark_resolved`] it reports failure.
///
/// # Example
///
/// ```ignore
/// let mut guard = LaunchGuard::new(launch_id, Some(bus));
/// let success = coordinator.await_launch(start, pre, post).await?;
/// guard.mark_resolved(success);
/// ```
pub struct LaunchGuard {
    launch_id: Uuid,
    event_bus: Option<EventBus>,
    resolved: bool,
}

impl LaunchGuard {
    pub fn new(launch_id: Uuid, event_bus: Option<EventBus>) -> Self {
        debug!(launch_id = %launch_id, "Launch guard created");

        Self {
            launch_id,
            event_bus,
            resolved: false,
        }
    }

    /// Record the launch result and publish it.
    ///
    /// Only the first call publishes.
    pub fn mark_resolved(&mut self, success: bool) {
        if self.resolved {
            return;
        }
        debug!(launch_id = %self.launch_id, success, "Launch resolved");
        self.emit(success);
        self.resolved = true;
    }

    /// Record a launch that ended with an error. Publishes `LaunchFailed`
    /// with `error`, then the failed result.
    pub fn mark_failed(&mut self, error: &str) {
        if self.resolved {
            return;
        }
        warn!(launch_id = %self.launch_id, error = %error, "Launch failed");
        if let Some(ref bus) = self.event_bus {
            bus.emit(Event::LaunchFailed {
                launch_id: self.launch_id,
                message: error.to_string(),
            });
        }
        self.emit(false);
        self.resolved = true;
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn launch_id(&self) -> Uuid {
        self.launch_id
    }

    fn emit(&self, success: bool) {
        if let Some(ref bus) = self.event_bus {
            bus.emit(Event::LaunchResolved {
                launch_id: self.launch_id,
                success,
            });
        }
    }
}

impl Drop for LaunchGuard {
    fn drop(&mut self) {
        if !self.resolved {
            warn!(
                launch_id = %self.launch_id,
                "Launch dropped before resolving - reporting failure"
            );
            self.emit(false);
        }
    }
}
