use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Intent-like request describing the screen the host should open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct LaunchRequest {
    /// Activity the host should instantiate
    pub activity: String,
    /// Host-specific launch flags (e.g. "new_task", "clear_top")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    /// Extra string payload forwarded to the activity
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl LaunchRequest {
    pub fn new(activity: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
            ..Self::default()
        }
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}
