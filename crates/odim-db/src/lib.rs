//! Schema persistence over MongoDB and SQL databases
//!
//! A schema is a serde type implementing [`Schema`]. Its [`SchemaMeta`]
//! names a connection, or declares a backend family and lets the first
//! matching connection serve it. [`Odim`] resolves each schema to a
//! [`Driver`] once and hands out [`Manager`]s for it.
//!
//! ```no_run
//! use odim_db::{Odim, Query, RecordId, Result, Schema, SchemaMeta};
//! use odim_conf::Settings;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Task {
//! 	id: Option<i64>,
//! 	title: String,
//! 	done: bool,
//! }
//!
//! impl Schema for Task {
//! 	fn meta() -> SchemaMeta {
//! 		SchemaMeta::new("Task").connection("default").table("tasks")
//! 	}
//!
//! 	fn id(&self) -> Option<RecordId> {
//! 		self.id.map(RecordId::Int)
//! 	}
//!
//! 	fn set_id(&mut self, id: RecordId) -> Result<()> {
//! 		self.id = Some(id.as_i64()?);
//! 		Ok(())
//! 	}
//! }
//!
//! # async fn run() -> Result<()> {
//! let odim = Odim::new(Settings::new().with_database("default", "postgres://app@localhost/app"));
//! let tasks = odim.objects::<Task>()?;
//!
//! let mut task = Task { id: None, title: "write docs".into(), done: false };
//! tasks.bind(&mut task).save().await?;
//!
//! let open = tasks.find(&Query::new().filter("done", false)).await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod context;
pub mod dispatch;
pub mod document;
pub mod driver;
pub mod error;
pub mod manager;
pub mod query;
pub mod relational;
pub mod retry;
pub mod schema;
pub mod search;

pub use connection::ConnectionRegistry;
pub use context::Odim;
pub use dispatch::{DRIVERS, DriverSpec, SchemaEntry, backend_for_protocol};
pub use document::{DocumentBackend, DocumentDriver, FindOptions, MongoBackend, UpdateResult};
pub use driver::{DeleteTarget, Driver, WriteResult};
pub use error::{OdimError, Result};
pub use manager::{BoundManager, Manager};
pub use query::{NormalizedQuery, Operation, Query, parse_field};
pub use relational::{SqlDialect, SqlDriver, SqlPool};
pub use schema::{Backend, Binding, FieldType, RecordId, Schema, SchemaMeta};
pub use search::{OkResponse, SearchParams, SearchResponse, SortDirection, SortField, parse_q};

pub use bson;
