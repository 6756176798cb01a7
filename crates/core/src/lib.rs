//! Domain types shared by the dev launcher crates.
//!
//! Nothing in here talks to a host. These are the values that flow between
//! a loader, the launch coordinator and the host lifecycle.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::{CoreError, Result};
