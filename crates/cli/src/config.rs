use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use launcher::{LaunchPolicy, SimulatedHostOptions};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const LAUNCHER_DIR: &str = ".dev-launcher";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_BUNDLE_URL: &str = "http://localhost:8081/index.bundle?platform=android";
pub const DEFAULT_ACTIVITY: &str = "MainActivity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Plain bundle served by a packager
    #[default]
    ReactNative,
    /// Development build described by a manifest
    DevBuild,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub launch: LaunchSection,
    pub host: HostSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSection {
    pub bundle_url: String,
    pub variant: Variant,
    pub manifest: Option<PathBuf>,
    pub activity: String,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSection {
    pub creation_delay_ms: u64,
    pub ready_delay_ms: u64,
    pub ready_events: usize,
}

impl Default for LaunchSection {
    fn default() -> Self {
        Self {
            bundle_url: DEFAULT_BUNDLE_URL.to_string(),
            variant: Variant::default(),
            manifest: None,
            activity: DEFAULT_ACTIVITY.to_string(),
            timeout_ms: None,
        }
    }
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            creation_delay_ms: 0,
            ready_delay_ms: 250,
            ready_events: 1,
        }
    }
}

impl LauncherConfig {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(LAUNCHER_DIR).join(CONFIG_FILE)
    }

    /// Read the config at `path`. A missing file yields the defaults, and so
    /// does a file that fails to parse (with a warning).
    pub async fn load(path: &Path) -> Self {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    pub fn policy(&self) -> LaunchPolicy {
        match self.launch.timeout_ms {
            Some(ms) => LaunchPolicy::with_timeout(Duration::from_millis(ms)),
            None => LaunchPolicy::unbounded(),
        }
    }

    pub fn host_options(&self) -> SimulatedHostOptions {
        SimulatedHostOptions {
            creation_delay: Duration::from_millis(self.host.creation_delay_ms),
            ready_delay: Duration::from_millis(self.host.ready_delay_ms),
            ready_events: self.host.ready_events,
            ..Default::default()
        }
    }
}
