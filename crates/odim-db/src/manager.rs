//! Type-bound and instance-bound entry points over a schema's driver

use crate::dispatch::SchemaEntry;
use crate::driver::{DeleteTarget, Driver, WriteResult};
use crate::error::Result;
use crate::query::Query;
use crate::schema::{Backend, RecordId, Schema};
use crate::search::{SearchParams, SearchResponse};
use odim_signals::{HookRegistry, Record};
use std::sync::Arc;

/// Operations on every record of `M`
///
/// Obtained from [`Odim::objects`](crate::Odim::objects). Cheap to clone.
pub struct Manager<M: Schema> {
	entry: Arc<SchemaEntry<M>>,
	driver: Arc<dyn Driver<M>>,
}

impl<M: Schema> Clone for Manager<M> {
	fn clone(&self) -> Self {
		Self {
			entry: Arc::clone(&self.entry),
			driver: Arc::clone(&self.driver),
		}
	}
}

impl<M: Schema> Manager<M> {
	pub(crate) fn new(entry: Arc<SchemaEntry<M>>, driver: Arc<dyn Driver<M>>) -> Self {
		Self { entry, driver }
	}

	pub fn backend(&self) -> Backend {
		self.driver.backend()
	}

	pub fn hooks(&self) -> &Arc<HookRegistry<M>> {
		self.entry.hooks()
	}

	pub async fn get(&self, id: impl Into<RecordId>) -> Result<M> {
		self.driver.get(&id.into(), &Query::new(), false).await
	}

	/// Fetch by identifier with extra conditions, optionally seeing deleted records
	pub async fn get_with(&self, id: impl Into<RecordId>, extend: &Query, include_deleted: bool) -> Result<M> {
		self.driver.get(&id.into(), extend, include_deleted).await
	}

	pub async fn find(&self, query: &Query) -> Result<Vec<M>> {
		self.driver.find(query, None, false).await
	}

	pub async fn find_with(&self, query: &Query, params: &SearchParams, include_deleted: bool) -> Result<Vec<M>> {
		self.driver.find(query, Some(params), include_deleted).await
	}

	pub async fn count(&self, query: &Query) -> Result<u64> {
		self.driver.count(query, false).await
	}

	pub async fn count_with(&self, query: &Query, include_deleted: bool) -> Result<u64> {
		self.driver.count(query, include_deleted).await
	}

	/// Count and page through the records matching `query`
	///
	/// The response echoes `params` together with the query under `q`.
	pub async fn search(&self, query: &Query, params: &SearchParams) -> Result<SearchResponse<M>> {
		let total = self.driver.count(query, false).await?;
		let results = self.driver.find(query, Some(params), false).await?;
		let mut search = serde_json::to_value(params)?;
		if let Some(echo) = search.as_object_mut() {
			echo.insert("q".to_string(), serde_json::to_value(query)?);
		}
		Ok(SearchResponse {
			search,
			total,
			results,
		})
	}

	pub async fn delete<'a>(&self, target: impl Into<DeleteTarget<'a, M>>) -> Result<WriteResult> {
		self.driver.delete(target.into(), &Query::new(), false).await
	}

	pub async fn delete_with<'a>(
		&self,
		target: impl Into<DeleteTarget<'a, M>>,
		extend: &Query,
		force_harddelete: bool,
	) -> Result<WriteResult> {
		self.driver.delete(target.into(), extend, force_harddelete).await
	}

	/// Build an instance from raw input, running the validation hooks
	pub async fn construct(&self, record: Record) -> Result<M> {
		self.entry.construct(record).await
	}

	/// `Name<id>`, or `Name<???>` before the first save
	pub fn describe(&self, instance: &M) -> String {
		match instance.id() {
			Some(id) => format!("{}<{}>", self.entry.name(), id),
			None => format!("{}<???>", self.entry.name()),
		}
	}

	/// Operations that write through `instance`
	pub fn bind<'a>(&self, instance: &'a mut M) -> BoundManager<'a, M> {
		BoundManager {
			driver: Arc::clone(&self.driver),
			instance,
		}
	}
}

/// Writes on one instance
///
/// Hooks may replace the instance; the replacement is written back.
pub struct BoundManager<'a, M: Schema> {
	driver: Arc<dyn Driver<M>>,
	instance: &'a mut M,
}

impl<M: Schema> BoundManager<'_, M> {
	pub fn instance(&self) -> &M {
		self.instance
	}

	/// Insert or replace; returns the record's identifier
	pub async fn save(&mut self) -> Result<RecordId> {
		self.driver.save(self.instance, &Query::new(), false).await
	}

	pub async fn save_with(&mut self, extend: &Query, include_deleted: bool) -> Result<RecordId> {
		self.driver.save(self.instance, extend, include_deleted).await
	}

	/// Write the instance's non-null fields
	pub async fn update(&mut self) -> Result<WriteResult> {
		self.driver.update(self.instance, &Query::new(), false, None).await
	}

	pub async fn update_with(
		&mut self,
		extend: &Query,
		include_deleted: bool,
		only_fields: Option<&[String]>,
	) -> Result<WriteResult> {
		self.driver
			.update(self.instance, extend, include_deleted, only_fields)
			.await
	}

	pub async fn delete(&mut self, force_harddelete: bool) -> Result<WriteResult> {
		self.driver
			.delete(DeleteTarget::Instance(&*self.instance), &Query::new(), force_harddelete)
			.await
	}
}
