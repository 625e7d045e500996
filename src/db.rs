//! Schemas, queries, drivers and managers.
//!
//! # Examples
//!
//! ```rust
//! use odim::db::{Operation, Query, parse_field};
//!
//! assert_eq!(parse_field("age__gte"), ("age", Operation::Gte));
//! let query = Query::new().filter("age__gte", 18).filter("name__contains", "an");
//! assert_eq!(query.normalize().len(), 2);
//! ```

pub use odim_db::*;
