//! RAII guards for launch attempts.
//!
//! - [`LaunchGuard`] - Guarantees every started launch publishes exactly one
//!   `launch.resolved` event

mod launch_guard;

pub use launch_guard::LaunchGuard;
