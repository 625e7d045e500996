//! MongoDB-backed document driver

pub mod backend;
pub mod convert;
pub mod driver;
pub mod filter;
pub mod mongo;

pub use backend::{DocumentBackend, FindOptions, UpdateResult};
pub use driver::DocumentDriver;
pub use mongo::MongoBackend;
