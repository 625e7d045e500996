//! What a hook callback receives

use serde_json::{Map, Value};

/// A raw record as read from the store, before it becomes an instance
pub type Record = Map<String, Value>;

/// The value passed through a hook chain
#[derive(Debug, Clone, PartialEq)]
pub enum Subject<M> {
	Record(Record),
	Instance(M),
}

impl<M> Subject<M> {
	pub fn kind(&self) -> &'static str {
		match self {
			Subject::Record(_) => "record",
			Subject::Instance(_) => "instance",
		}
	}

	pub fn as_record(&self) -> Option<&Record> {
		match self {
			Subject::Record(record) => Some(record),
			Subject::Instance(_) => None,
		}
	}

	pub fn as_instance(&self) -> Option<&M> {
		match self {
			Subject::Instance(instance) => Some(instance),
			Subject::Record(_) => None,
		}
	}

	pub fn into_record(self) -> Option<Record> {
		match self {
			Subject::Record(record) => Some(record),
			Subject::Instance(_) => None,
		}
	}

	pub fn into_instance(self) -> Option<M> {
		match self {
			Subject::Instance(instance) => Some(instance),
			Subject::Record(_) => None,
		}
	}
}

/// Extra facts about the operation that triggered a hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
	/// Schema name
	pub schema: &'static str,
	/// Set on save hooks: whether the write creates a new record
	pub created: Option<bool>,
	/// Set on remove hooks: whether the removal is a soft delete
	pub softdelete: Option<bool>,
}

impl HookContext {
	pub fn new(schema: &'static str) -> Self {
		Self {
			schema,
			created: None,
			softdelete: None,
		}
	}

	pub fn saving(schema: &'static str, created: bool) -> Self {
		Self {
			created: Some(created),
			..Self::new(schema)
		}
	}

	pub fn removing(schema: &'static str, softdelete: bool) -> Self {
		Self {
			softdelete: Some(softdelete),
			..Self::new(schema)
		}
	}
}
