//! Document store seam
//!
//! The document driver talks to MongoDB through this trait so the same
//! driver logic runs against an in-process store in tests.

use crate::error::Result;
use async_trait::async_trait;
use bson::{Bson, Document};

/// Options for a multi-document find
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
	pub skip: Option<u64>,
	pub limit: Option<i64>,
	pub sort: Option<Document>,
}

/// Outcome of a replace or update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
	pub matched_count: u64,
	pub modified_count: u64,
}

impl UpdateResult {
	pub fn new(matched_count: u64, modified_count: u64) -> Self {
		Self {
			matched_count,
			modified_count,
		}
	}
}

#[async_trait]
pub trait DocumentBackend: Send + Sync {
	/// Database every collection lives in
	fn database_name(&self) -> &str;

	async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>>;

	async fn find_many(&self, collection: &str, filter: Document, options: FindOptions) -> Result<Vec<Document>>;

	/// Insert a document and return its `_id`
	async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson>;

	async fn replace_one(&self, collection: &str, filter: Document, replacement: Document) -> Result<UpdateResult>;

	async fn update_one(&self, collection: &str, filter: Document, update: Document) -> Result<UpdateResult>;

	/// Delete at most one document and return how many were removed
	async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64>;

	async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64>;

	/// Release client resources
	async fn close(&self) {}
}
