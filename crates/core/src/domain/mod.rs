mod bundle;
mod handles;
mod lifecycle;
mod manifest;
mod request;

pub use bundle::{BundleLocation, DEFAULT_BUNDLE_NAME};
pub use handles::{ActivityHandle, RuntimeContext};
pub use lifecycle::{LifecycleState, LifecycleStateMachine};
pub use manifest::{AppManifest, Orientation, UserInterfaceStyle};
pub use request::LaunchRequest;
