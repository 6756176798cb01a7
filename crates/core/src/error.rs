use thiserror::Error;

use crate::domain::LifecycleState;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid bundle url {url}: {reason}")]
    InvalidBundleUrl { url: String, reason: String },

    #[error("Bundle url has no host: {0}")]
    MissingHost(String),

    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
