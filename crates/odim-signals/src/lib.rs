//! # odim-signals
//!
//! Lifecycle hooks for persisted schemas.
//!
//! Each schema owns a [`HookRegistry`]. Drivers run its callbacks around
//! materialization (`pre_init`, `pre_validate`, `post_validate`,
//! `post_init`), writes (`pre_save`, `post_save`) and removal
//! (`pre_remove`, `post_remove`). A callback may return a replacement
//! subject, which the next callback and the driver then use.

pub mod error;
pub mod event;
pub mod registry;
pub mod subject;

pub use error::{HookError, HookResult};
pub use event::HookEvent;
pub use registry::{HookFn, HookFuture, HookRegistry};
pub use subject::{HookContext, Record, Subject};
