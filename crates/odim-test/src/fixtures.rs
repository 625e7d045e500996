//! Sample schemas and ready-to-use contexts

use crate::memory::MemoryDocumentBackend;
use bson::oid::ObjectId;
use odim_conf::{RetryPolicy, Settings};
use odim_db::{FieldType, Odim, RecordId, Result, Schema, SchemaMeta};
use rstest::fixture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DOCS_ALIAS: &str = "docs";
pub const SQL_ALIAS: &str = "sql";

/// Table backing [`Ticket`] on SQLite
pub const TICKETS_DDL: &str = "CREATE TABLE IF NOT EXISTS tickets (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	title TEXT NOT NULL,
	priority INTEGER NOT NULL DEFAULT 0,
	closed BOOLEAN NOT NULL DEFAULT 0,
	labels TEXT,
	assignee TEXT,
	deleted BOOLEAN NOT NULL DEFAULT 0
)";

/// A document schema with soft delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
	#[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
	pub id: Option<ObjectId>,
	pub name: String,
	pub age: i64,
	#[serde(default)]
	pub email: Option<String>,
}

impl Person {
	pub fn new(name: impl Into<String>, age: i64) -> Self {
		Self {
			id: None,
			name: name.into(),
			age,
			email: None,
		}
	}

	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());
		self
	}
}

impl Schema for Person {
	fn meta() -> SchemaMeta {
		SchemaMeta::new("Person")
			.connection(DOCS_ALIAS)
			.collection("people")
			.soft_delete("deleted")
	}

	fn id(&self) -> Option<RecordId> {
		self.id.map(RecordId::ObjectId)
	}

	fn set_id(&mut self, id: RecordId) -> Result<()> {
		self.id = Some(id.as_object_id()?);
		Ok(())
	}
}

/// A document schema without soft delete, bound by backend family only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
	#[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
	pub id: Option<ObjectId>,
	pub body: String,
}

impl Schema for Note {
	fn meta() -> SchemaMeta {
		SchemaMeta::new("Note").document()
	}

	fn id(&self) -> Option<RecordId> {
		self.id.map(RecordId::ObjectId)
	}

	fn set_id(&mut self, id: RecordId) -> Result<()> {
		self.id = Some(id.as_object_id()?);
		Ok(())
	}
}

/// A relational schema with soft delete and a JSON column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
	pub id: Option<i64>,
	pub title: String,
	pub priority: i64,
	pub closed: bool,
	#[serde(default)]
	pub labels: Vec<String>,
	#[serde(default)]
	pub assignee: Option<String>,
}

impl Ticket {
	pub fn new(title: impl Into<String>, priority: i64) -> Self {
		Self {
			id: None,
			title: title.into(),
			priority,
			closed: false,
			labels: Vec::new(),
			assignee: None,
		}
	}

	pub fn with_labels(mut self, labels: &[&str]) -> Self {
		self.labels = labels.iter().map(|label| label.to_string()).collect();
		self
	}

	pub fn assigned_to(mut self, assignee: impl Into<String>) -> Self {
		self.assignee = Some(assignee.into());
		self
	}
}

impl Schema for Ticket {
	fn meta() -> SchemaMeta {
		SchemaMeta::new("Ticket")
			.connection(SQL_ALIAS)
			.table("tickets")
			.soft_delete("deleted")
			.field("closed", FieldType::Bool)
			.field("labels", FieldType::Json)
	}

	fn id(&self) -> Option<RecordId> {
		self.id.map(RecordId::Int)
	}

	fn set_id(&mut self, id: RecordId) -> Result<()> {
		self.id = Some(id.as_i64()?);
		Ok(())
	}
}

/// Settings with a document alias and an in-memory SQLite alias
///
/// Retries keep the default attempt count but wait only a millisecond.
pub fn test_settings() -> Settings {
	Settings::new()
		.with_database(DOCS_ALIAS, "mongodb://localhost:27017/odim_test")
		.with_database(SQL_ALIAS, "sqlite::memory:")
		.with_retry(RetryPolicy::new(5, Duration::from_millis(1)))
}

#[fixture]
pub fn memory_backend() -> Arc<MemoryDocumentBackend> {
	Arc::new(MemoryDocumentBackend::new("odim_test"))
}

/// An [`Odim`] whose document alias is served by `backend`
pub async fn document_odim(backend: Arc<MemoryDocumentBackend>) -> Odim {
	let odim = Odim::new(test_settings());
	odim.install_document_backend(DOCS_ALIAS, backend).await;
	odim
}

/// An [`Odim`] over in-memory SQLite with the `tickets` table created
pub async fn sqlite_odim() -> Result<Odim> {
	let odim = Odim::new(test_settings());
	let pool = odim.connections().sql_pool(SQL_ALIAS).await?;
	pool.execute_script(TICKETS_DDL).await?;
	Ok(odim)
}
