pub mod config;
pub mod coordinator;
pub mod dev_menu;
pub mod error;
pub mod host;
pub mod loader;
pub mod loaders;
pub mod resources;
pub mod simulated;

pub use config::{LaunchPolicy, LoaderConfig};
pub use coordinator::{CompletionSignal, LaunchCoordinator, LifecycleCell};
pub use dev_menu::DevMenuRegistry;
pub use error::{LaunchError, Result};
pub use host::{
    AppContext, DebugHostRewriter, DebugServerTarget, HostLifecycle, HostSettingsRewriter,
    RuntimeHost,
};
pub use loader::{AppLoader, Launcher};
pub use loaders::{DevelopmentBuildLoader, ManifestSource, ReactNativeLoader};
pub use simulated::{SimulatedHost, SimulatedHostOptions};
