//! Lifecycle hooks.

pub use odim_signals::*;
