use launcher_core::CoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LaunchError {
    /// A runtime context already exists on the host. Reusing a loader or
    /// launching twice against one host is a programming error.
    #[error("Runtime context {context_id} already exists; a host cannot be launched twice")]
    ContextAlreadyActive { context_id: Uuid },

    #[error("Could not resolve bundle location: {0}")]
    BundleResolution(String),

    #[error("Launch timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    #[error("Domain error: {0}")]
    Core(#[from] CoreError),
}

impl LaunchError {
    pub fn bundle_resolution(reason: impl Into<String>) -> Self {
        Self::BundleResolution(reason.into())
    }

    /// Fatal errors point at misuse of the launcher and must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ContextAlreadyActive { .. })
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;
