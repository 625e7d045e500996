//! The contract every storage driver implements

use crate::error::Result;
use crate::query::Query;
use crate::schema::{Backend, RecordId, Schema};
use crate::search::SearchParams;
use async_trait::async_trait;
use serde::Serialize;

/// Counts reported by a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteResult {
	/// Records the write filter matched
	pub matched: u64,
	/// Records actually changed or removed
	pub affected: u64,
}

impl WriteResult {
	pub fn new(matched: u64, affected: u64) -> Self {
		Self { matched, affected }
	}
}

/// What a delete removes: an identifier, or a loaded instance
#[derive(Debug, Clone)]
pub enum DeleteTarget<'a, M> {
	Id(RecordId),
	Instance(&'a M),
}

impl<M> From<RecordId> for DeleteTarget<'_, M> {
	fn from(id: RecordId) -> Self {
		DeleteTarget::Id(id)
	}
}

impl<'a, M> From<&'a M> for DeleteTarget<'a, M> {
	fn from(instance: &'a M) -> Self {
		DeleteTarget::Instance(instance)
	}
}

/// CRUD over one schema
///
/// `extend` adds extra equality-style conditions to the write or lookup
/// filter, for instance a tenant key. Unless `include_deleted` is set,
/// soft-deleted records are invisible to every operation except delete.
#[async_trait]
pub trait Driver<M: Schema>: Send + Sync {
	fn backend(&self) -> Backend;

	/// Load one record by identifier; `NotFound` if nothing matches
	async fn get(&self, id: &RecordId, extend: &Query, include_deleted: bool) -> Result<M>;

	/// Insert a new record or replace an existing one
	///
	/// The instance is updated in place with whatever the hooks returned
	/// and, on insert, the generated identifier.
	async fn save(&self, instance: &mut M, extend: &Query, include_deleted: bool) -> Result<RecordId>;

	/// Write the instance's non-null fields, optionally only `only_fields`
	async fn update(
		&self,
		instance: &mut M,
		extend: &Query,
		include_deleted: bool,
		only_fields: Option<&[String]>,
	) -> Result<WriteResult>;

	async fn find(&self, query: &Query, params: Option<&SearchParams>, include_deleted: bool) -> Result<Vec<M>>;

	async fn count(&self, query: &Query, include_deleted: bool) -> Result<u64>;

	/// Soft-delete if the schema declares it and `force_harddelete` is
	/// false; remove the record otherwise
	async fn delete(&self, target: DeleteTarget<'_, M>, extend: &Query, force_harddelete: bool) -> Result<WriteResult>;
}
