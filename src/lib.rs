//! # odim
//!
//! Schema-driven persistence over MongoDB, MySQL, PostgreSQL and SQLite
//! behind one query algebra.
//!
//! A schema is an ordinary serde type. Its metadata says which connection
//! serves it, or only which backend family it belongs to. Queries are flat
//! maps whose keys may carry an operation suffix (`age__gte`,
//! `name__contains`, `email__null`); each driver renders them natively.
//! Lifecycle hooks can observe or replace the record at every step.
//!
//! ## Crates
//!
//! - [`conf`]: settings, connection parameters and URI handling
//! - [`signals`]: the hook registry
//! - [`db`]: schemas, queries, drivers, managers and [`Odim`](db::Odim)
//! - [`test`]: in-memory document store and fixtures (feature `testing`)
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use odim::prelude::*;
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Article {
//! 	#[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
//! 	id: Option<bson::oid::ObjectId>,
//! 	title: String,
//! 	views: i64,
//! }
//!
//! impl Schema for Article {
//! 	fn meta() -> SchemaMeta {
//! 		SchemaMeta::new("Article").document().soft_delete("deleted")
//! 	}
//!
//! 	fn id(&self) -> Option<RecordId> {
//! 		self.id.map(RecordId::ObjectId)
//! 	}
//!
//! 	fn set_id(&mut self, id: RecordId) -> odim::db::Result<()> {
//! 		self.id = Some(id.as_object_id()?);
//! 		Ok(())
//! 	}
//! }
//!
//! # async fn run() -> odim::db::Result<()> {
//! let odim = Odim::new(Settings::from_env()?);
//! let articles = odim.objects::<Article>()?;
//!
//! let popular = articles
//! 	.find_with(
//! 		&Query::new().filter("views__gte", 1000),
//! 		&SearchParams::new().with_sort("-views").with_limit(10),
//! 		false,
//! 	)
//! 	.await?;
//! # Ok(())
//! # }
//! ```

pub mod conf;
pub mod db;
pub mod signals;

pub use odim_db::bson;

pub mod prelude {
	pub use crate::conf::{ConnectionParams, PoolSettings, RetryPolicy, Settings};
	pub use crate::db::{
		Backend, BoundManager, DeleteTarget, Driver, FieldType, Manager, Odim, OdimError, Operation, Query, RecordId,
		Schema, SchemaMeta, SearchParams, SearchResponse, WriteResult,
	};
	pub use crate::signals::{HookContext, HookEvent, HookRegistry, Subject};

	pub use crate::bson;
	pub use serde::{Deserialize, Serialize};
}
