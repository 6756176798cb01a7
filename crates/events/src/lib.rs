//! Event system for the dev launcher
//!
//! Two flavours of delivery live here: a broadcast [`EventBus`] for
//! observers that only watch launches, and a synchronous
//! [`ListenerRegistry`] for host lifecycle callbacks that must run inline
//! on the host's dispatch thread.

mod bus;
mod listeners;
mod types;

pub use bus::EventBus;
pub use listeners::{ListenerId, ListenerRegistry};
pub use types::*;
