//! Process-wide dev menu bookkeeping.
//!
//! An app can be opened from a deep link without going through the launcher
//! UI, so the menu may still be missing when a context becomes ready. Every
//! loader asks the registry to install it; the registry does so once per
//! runtime context.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use launcher_core::RuntimeContext;
use tracing::debug;
use uuid::Uuid;

/// Property set on a runtime context once the dev menu is installed.
pub const DEV_MENU_PROPERTY: &str = "dev_menu_installed";

/// Context ids are kept for the life of the registry. A process starts few
/// runtime contexts, and a forgotten id would let a reload install the menu
/// twice.
#[derive(Debug, Default)]
pub struct DevMenuRegistry {
    initialized: Mutex<HashSet<Uuid>>,
}

impl DevMenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the dev menu for `context` unless that already happened.
    ///
    /// Returns `true` only for the call that installed it.
    pub fn maybe_init(&self, context: &RuntimeContext) -> bool {
        let inserted = self
            .initialized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(context.id());

        if inserted {
            context.set_property(DEV_MENU_PROPERTY, true);
            debug!(context_id = %context.id(), "Dev menu installed");
        }
        inserted
    }

    pub fn is_initialized(&self, context: &RuntimeContext) -> bool {
        self.initialized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&context.id())
    }

    pub fn initialized_count(&self) -> usize {
        self.initialized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
