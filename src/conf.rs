//! Settings and connection parameters.
//!
//! # Examples
//!
//! ```rust
//! use odim::conf::Settings;
//!
//! let settings = Settings::new().with_database("default", "sqlite::memory:");
//! assert!(settings.connection_params("default").unwrap().is_in_memory());
//! ```

pub use odim_conf::*;
