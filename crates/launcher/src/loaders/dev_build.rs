//! Loader for development builds described by an app manifest.

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use launcher_core::{ActivityHandle, AppManifest, BundleLocation, RuntimeContext};
use tracing::{debug, warn};

use crate::error::{LaunchError, Result};
use crate::loader::AppLoader;

/// Property keys the loader writes onto activities and runtime contexts.
pub mod properties {
    pub const TASK_DESCRIPTION: &str = "task_description";
    pub const BACKGROUND_COLOR: &str = "background_color";
    pub const USER_INTERFACE_STYLE: &str = "user_interface_style";
    pub const ORIENTATION: &str = "orientation";
    pub const MANIFEST: &str = "manifest";
}

/// Where the manifest comes from.
#[derive(Debug, Clone)]
pub enum ManifestSource {
    Inline(AppManifest),
    /// JSON file read lazily when the bundle location is first requested
    File(PathBuf),
}

#[derive(Debug)]
pub struct DevelopmentBuildLoader {
    source: ManifestSource,
    manifest: OnceLock<AppManifest>,
}

impl DevelopmentBuildLoader {
    pub fn new(source: ManifestSource) -> Self {
        let manifest = OnceLock::new();
        if let ManifestSource::Inline(inline) = &source {
            let _ = manifest.set(inline.clone());
        }
        Self { source, manifest }
    }

    pub fn from_manifest(manifest: AppManifest) -> Self {
        Self::new(ManifestSource::Inline(manifest))
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(ManifestSource::File(path.into()))
    }

    /// Manifest, once it has been loaded.
    pub fn manifest(&self) -> Option<&AppManifest> {
        self.manifest.get()
    }

    async fn load_manifest(&self) -> Result<&AppManifest> {
        if let Some(manifest) = self.manifest.get() {
            return Ok(manifest);
        }

        let ManifestSource::File(path) = &self.source else {
            return Err(LaunchError::bundle_resolution("manifest source is empty"));
        };

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            LaunchError::bundle_resolution(format!("reading {}: {e}", path.display()))
        })?;
        let manifest = AppManifest::from_json(&content)?;
        debug!(path = %path.display(), name = %manifest.name, "Manifest loaded");

        Ok(self.manifest.get_or_init(|| manifest))
    }
}

#[async_trait]
impl AppLoader for DevelopmentBuildLoader {
    async fn bundle_location(&self) -> Result<BundleLocation> {
        Ok(self.load_manifest().await?.bundle_url.clone())
    }

    fn on_before_creation(&self, activity: &ActivityHandle) {
        let Some(manifest) = self.manifest() else {
            return;
        };

        activity.set_property(properties::TASK_DESCRIPTION, manifest.name.clone());
        activity.set_property(
            properties::USER_INTERFACE_STYLE,
            manifest.user_interface_style.as_str(),
        );
        if let Some(color) = &manifest.background_color {
            activity.set_property(properties::BACKGROUND_COLOR, color.clone());
        }
    }

    fn on_create(&self, activity: &ActivityHandle) {
        if let Some(manifest) = self.manifest() {
            activity.set_property(properties::ORIENTATION, manifest.orientation.as_str());
        }
    }

    fn on_context_ready(&self, context: &RuntimeContext) {
        let Some(manifest) = self.manifest() else {
            return;
        };

        match serde_json::to_value(manifest) {
            Ok(value) => context.set_property(properties::MANIFEST, value),
            Err(e) => warn!(error = %e, "Could not expose manifest to runtime context"),
        }
    }

    fn bundle_name(&self) -> Option<String> {
        self.manifest().map(|m| m.name.clone())
    }
}
