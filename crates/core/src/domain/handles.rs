//! Shared handles the host hands to lifecycle listeners.
//!
//! Both handles are cheap to clone and clones observe the same property
//! map, so configuration written by a hook on one thread is visible to the
//! host and to the caller afterwards.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use uuid::Uuid;

type Properties = Arc<Mutex<BTreeMap<String, Value>>>;

fn lock(properties: &Properties) -> MutexGuard<'_, BTreeMap<String, Value>> {
    properties.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The host screen an instance is being created in.
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    id: Uuid,
    name: String,
    properties: Properties,
}

impl ActivityHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            properties: Properties::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<Value>) {
        lock(&self.properties).insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<Value> {
        lock(&self.properties).get(key).cloned()
    }

    pub fn properties(&self) -> BTreeMap<String, Value> {
        lock(&self.properties).clone()
    }
}

/// Fully initialized execution environment exposed to application code.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    id: Uuid,
    properties: Properties,
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            properties: Properties::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<Value>) {
        lock(&self.properties).insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<Value> {
        lock(&self.properties).get(key).cloned()
    }

    pub fn properties(&self) -> BTreeMap<String, Value> {
        lock(&self.properties).clone()
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new()
    }
}
