//! Schema declarations
//!
//! A schema is a plain serde type plus a [`SchemaMeta`] describing where it
//! lives: which connection, which collection or table, the identifier
//! field and an optional soft-delete flag.

use crate::error::{OdimError, Result};
use bson::oid::ObjectId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Storage family a schema belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
	/// MongoDB
	Document,
	/// MySQL, PostgreSQL, SQLite
	Relational,
}

impl Backend {
	/// Identifier field used when the schema does not name one
	pub fn default_id_field(self) -> &'static str {
		match self {
			Backend::Document => "_id",
			Backend::Relational => "id",
		}
	}
}

impl fmt::Display for Backend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Backend::Document => f.write_str("document"),
			Backend::Relational => f.write_str("relational"),
		}
	}
}

/// How a schema names its connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
	/// A key of the `databases` settings table
	Alias(String),
	/// A connection URI used as is
	Uri(String),
}

impl Binding {
	pub fn as_str(&self) -> &str {
		match self {
			Binding::Alias(alias) => alias,
			Binding::Uri(uri) => uri,
		}
	}
}

/// Declared type of a field, used to coerce values read from SQL rows
///
/// SQL drivers hand back loosely typed columns: booleans arrive as
/// integers on SQLite and MySQL, JSON columns as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
	String,
	Integer,
	Float,
	Bool,
	Json,
	Any,
}

/// Static description of a schema
#[derive(Debug, Clone)]
pub struct SchemaMeta {
	name: &'static str,
	base: Option<Backend>,
	binding: Option<Binding>,
	physical_name: Option<String>,
	id_field: Option<String>,
	soft_delete: Option<String>,
	fields: Vec<(String, FieldType)>,
}

impl SchemaMeta {
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			base: None,
			binding: None,
			physical_name: None,
			id_field: None,
			soft_delete: None,
			fields: Vec::new(),
		}
	}

	/// Declare the schema as a document schema
	pub fn document(mut self) -> Self {
		self.base = Some(Backend::Document);
		self
	}

	/// Declare the schema as a relational schema
	pub fn relational(mut self) -> Self {
		self.base = Some(Backend::Relational);
		self
	}

	/// Bind to a connection alias from the settings
	pub fn connection(mut self, alias: impl Into<String>) -> Self {
		self.binding = Some(Binding::Alias(alias.into()));
		self
	}

	/// Bind to a connection URI directly
	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.binding = Some(Binding::Uri(uri.into()));
		self
	}

	/// Collection name for document schemas
	pub fn collection(mut self, name: impl Into<String>) -> Self {
		self.physical_name = Some(name.into());
		self
	}

	/// Table name for relational schemas
	pub fn table(self, name: impl Into<String>) -> Self {
		self.collection(name)
	}

	pub fn id_field(mut self, field: impl Into<String>) -> Self {
		self.id_field = Some(field.into());
		self
	}

	/// Mark records deleted by setting `field` instead of removing them
	pub fn soft_delete(mut self, field: impl Into<String>) -> Self {
		self.soft_delete = Some(field.into());
		self
	}

	pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
		self.fields.push((name.into(), ty));
		self
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn base(&self) -> Option<Backend> {
		self.base
	}

	pub fn binding(&self) -> Option<&Binding> {
		self.binding.as_ref()
	}

	/// Collection or table name, defaulting to the schema name
	pub fn physical_name(&self) -> &str {
		self.physical_name.as_deref().unwrap_or(self.name)
	}

	pub fn id_field_for(&self, backend: Backend) -> &str {
		self.id_field
			.as_deref()
			.unwrap_or_else(|| backend.default_id_field())
	}

	pub fn soft_delete_field(&self) -> Option<&str> {
		self.soft_delete.as_deref()
	}

	pub fn field_type(&self, name: &str) -> FieldType {
		self.fields
			.iter()
			.find(|(field, _)| field == name)
			.map_or(FieldType::Any, |(_, ty)| *ty)
	}
}

/// A persisted type
///
/// # Examples
///
/// ```
/// use odim_db::{RecordId, Result, Schema, SchemaMeta};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Author {
/// 	#[serde(skip_serializing_if = "Option::is_none")]
/// 	id: Option<i64>,
/// 	name: String,
/// }
///
/// impl Schema for Author {
/// 	fn meta() -> SchemaMeta {
/// 		SchemaMeta::new("Author").relational().table("authors")
/// 	}
///
/// 	fn id(&self) -> Option<RecordId> {
/// 		self.id.map(RecordId::Int)
/// 	}
///
/// 	fn set_id(&mut self, id: RecordId) -> Result<()> {
/// 		self.id = Some(id.as_i64()?);
/// 		Ok(())
/// 	}
/// }
///
/// assert_eq!(Author::meta().physical_name(), "authors");
/// ```
pub trait Schema: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
	fn meta() -> SchemaMeta;

	/// The identifier, or `None` if the instance was never stored
	fn id(&self) -> Option<RecordId>;

	fn set_id(&mut self, id: RecordId) -> Result<()>;
}

/// Identifier of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
	ObjectId(ObjectId),
	Int(i64),
	String(String),
}

impl RecordId {
	/// The identifier as an ObjectId, parsing hex strings
	pub fn as_object_id(&self) -> Result<ObjectId> {
		match self {
			RecordId::ObjectId(oid) => Ok(*oid),
			RecordId::String(s) => ObjectId::parse_str(s)
				.map_err(|_| OdimError::Validation(format!("`{}` is not a valid ObjectId", s))),
			RecordId::Int(i) => Err(OdimError::Validation(format!(
				"integer id {} cannot be used as an ObjectId",
				i
			))),
		}
	}

	/// The identifier as an integer, parsing numeric strings
	pub fn as_i64(&self) -> Result<i64> {
		match self {
			RecordId::Int(i) => Ok(*i),
			RecordId::String(s) => s
				.parse()
				.map_err(|_| OdimError::Validation(format!("`{}` is not a valid integer id", s))),
			RecordId::ObjectId(oid) => Err(OdimError::Validation(format!(
				"ObjectId {} cannot be used as an integer id",
				oid
			))),
		}
	}

	/// Value used in document filters
	///
	/// Hex strings that parse as an ObjectId are sent as ObjectIds.
	pub fn to_document_value(&self) -> Value {
		match self {
			RecordId::ObjectId(oid) => object_id_value(oid),
			RecordId::String(s) => match ObjectId::parse_str(s) {
				Ok(oid) => object_id_value(&oid),
				Err(_) => Value::String(s.clone()),
			},
			RecordId::Int(i) => Value::from(*i),
		}
	}

	/// Value used in SQL filters
	pub fn to_sql_value(&self) -> Value {
		match self {
			RecordId::ObjectId(oid) => Value::String(oid.to_hex()),
			RecordId::String(s) => Value::String(s.clone()),
			RecordId::Int(i) => Value::from(*i),
		}
	}
}

fn object_id_value(oid: &ObjectId) -> Value {
	serde_json::json!({ "$oid": oid.to_hex() })
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RecordId::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
			RecordId::Int(i) => write!(f, "{}", i),
			RecordId::String(s) => f.write_str(s),
		}
	}
}

impl From<ObjectId> for RecordId {
	fn from(oid: ObjectId) -> Self {
		RecordId::ObjectId(oid)
	}
}

impl From<i64> for RecordId {
	fn from(id: i64) -> Self {
		RecordId::Int(id)
	}
}

impl From<&str> for RecordId {
	fn from(id: &str) -> Self {
		RecordId::String(id.to_string())
	}
}

impl From<String> for RecordId {
	fn from(id: String) -> Self {
		RecordId::String(id)
	}
}
