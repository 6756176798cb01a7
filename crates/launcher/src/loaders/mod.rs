//! Concrete loader variants.

mod dev_build;
mod react_native;

pub use dev_build::{properties, DevelopmentBuildLoader, ManifestSource};
pub use react_native::ReactNativeLoader;
