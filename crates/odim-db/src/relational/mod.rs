//! MySQL, PostgreSQL and SQLite through one driver
//!
//! Statements are built with sea-query, rendered for the alias's dialect by
//! [`SqlBuilder`], and executed on its typed [`SqlPool`].

pub mod builder;
pub mod dialect;
pub mod driver;
pub mod pool;
mod row;

pub use builder::{SqlBuilder, Statement};
pub use dialect::SqlDialect;
pub use driver::SqlDriver;
pub use pool::SqlPool;
