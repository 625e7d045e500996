//! # odim-conf
//!
//! Settings for odim: the `databases` alias table, pool sizing and the
//! retry policy applied to reads.
//!
//! Settings can be built in code, parsed from TOML or JSON, or read from
//! the `DATABASES` environment variable.

pub mod connection;
pub mod error;
pub mod settings;

pub use connection::{ConnectionParams, mask_url_password};
pub use error::{ConfigError, ConfigResult};
pub use settings::{DATABASES_ENV, DatabaseEntry, PoolSettings, RetryPolicy, Settings};
