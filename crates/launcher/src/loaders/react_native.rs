use async_trait::async_trait;
use launcher_core::BundleLocation;

use crate::error::Result;
use crate::loader::{parse_bundle_location, AppLoader};

/// Loader for a plain app served straight from a packager URL.
///
/// Needs no extra configuration, so every hook keeps its default.
#[derive(Debug, Clone)]
pub struct ReactNativeLoader {
    bundle_url: String,
}

impl ReactNativeLoader {
    pub fn new(bundle_url: impl Into<String>) -> Self {
        Self {
            bundle_url: bundle_url.into(),
        }
    }

    pub fn bundle_url(&self) -> &str {
        &self.bundle_url
    }
}

#[async_trait]
impl AppLoader for ReactNativeLoader {
    async fn bundle_location(&self) -> Result<BundleLocation> {
        parse_bundle_location(&self.bundle_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchError;

    #[tokio::test]
    async fn test_resolves_bundle_location() {
        let loader = ReactNativeLoader::new("http://localhost:8081/index.bundle?platform=android");
        let location = loader.bundle_location().await.unwrap();

        assert_eq!(location.debug_server_host(), "localhost:8081");
        assert_eq!(location.bundle_name(), "index");
        assert!(loader.bundle_name().is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_is_resolution_error() {
        let loader = ReactNativeLoader::new("localhost");
        let result = loader.bundle_location().await;

        assert!(matches!(result, Err(LaunchError::BundleResolution(_))));
    }
}
