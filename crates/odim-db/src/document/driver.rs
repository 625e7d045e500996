//! Document-store driver

use super::backend::{DocumentBackend, FindOptions};
use super::convert::{document_to_record, json_to_bson, record_to_document};
use super::filter::{render_filter, render_page};
use crate::connection::ConnectionRegistry;
use crate::dispatch::SchemaEntry;
use crate::driver::{DeleteTarget, Driver, WriteResult};
use crate::error::{OdimError, Result};
use crate::query::Query;
use crate::retry::with_retries;
use crate::schema::{Backend, RecordId, Schema};
use crate::search::SearchParams;
use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use odim_signals::{HookContext, HookEvent};
use std::sync::Arc;

pub struct DocumentDriver<M: Schema> {
	entry: Arc<SchemaEntry<M>>,
	connections: Arc<ConnectionRegistry>,
}

impl<M: Schema> DocumentDriver<M> {
	pub fn new(entry: Arc<SchemaEntry<M>>, connections: Arc<ConnectionRegistry>) -> Self {
		Self { entry, connections }
	}

	async fn backend(&self) -> Result<Arc<dyn DocumentBackend>> {
		self.connections.document_backend(self.entry.connection()).await
	}

	fn collection(&self) -> &str {
		self.entry.meta().physical_name()
	}

	/// Identifier filter plus the soft-delete guard and `extend`
	fn id_filter(&self, id: &RecordId, extend: &Query, include_deleted: bool) -> Document {
		let mut query = Query::new().filter(self.entry.id_field(), id.to_document_value());
		if !include_deleted && let Some(field) = self.entry.soft_delete_field() {
			query.insert(field, false);
		}
		query.extend(extend);
		render_filter(&query.normalize())
	}

	/// Soft-delete guard followed by the caller's query, which may override it
	fn find_filter(&self, query: &Query, include_deleted: bool) -> Document {
		let mut full = Query::new();
		if !include_deleted && let Some(field) = self.entry.soft_delete_field() {
			full.insert(field, false);
		}
		full.extend(query);
		render_filter(&full.normalize())
	}

	async fn materialize(&self, document: Document) -> Result<M> {
		let instance = if self.entry.wants_raw_record() {
			let record = self.entry.before_construct(document_to_record(document)).await?;
			bson::deserialize_from_document(record_to_document(&record))?
		} else {
			bson::deserialize_from_document(document)?
		};
		self.entry.after_construct(instance).await
	}

	fn to_document(&self, instance: &M) -> Result<Document> {
		Ok(bson::serialize_to_document(instance)?)
	}

	fn not_found(&self, id: &RecordId) -> OdimError {
		OdimError::not_found(self.entry.name(), format!("{} = {}", self.entry.id_field(), id))
	}
}

fn record_id_from_bson(value: &Bson) -> Option<RecordId> {
	match value {
		Bson::ObjectId(oid) => Some(RecordId::ObjectId(*oid)),
		Bson::Int32(i) => Some(RecordId::Int(i64::from(*i))),
		Bson::Int64(i) => Some(RecordId::Int(*i)),
		Bson::String(s) => Some(RecordId::String(s.clone())),
		_ => None,
	}
}

#[async_trait]
impl<M: Schema> Driver<M> for DocumentDriver<M> {
	fn backend(&self) -> Backend {
		Backend::Document
	}

	async fn get(&self, id: &RecordId, extend: &Query, include_deleted: bool) -> Result<M> {
		let filter = self.id_filter(id, extend, include_deleted);
		tracing::debug!(schema = self.entry.name(), collection = self.collection(), %filter, "get");

		let backend = self.backend().await?;
		let document = backend
			.find_one(self.collection(), filter)
			.await?
			.ok_or_else(|| self.not_found(id))?;
		self.materialize(document).await
	}

	async fn save(&self, instance: &mut M, extend: &Query, include_deleted: bool) -> Result<RecordId> {
		let created = instance.id().is_none();
		let hooks = self.entry.hooks();
		let mut subject = hooks
			.run_instance(HookEvent::PreSave, instance.clone(), HookContext::saving(self.entry.name(), created))
			.await?;
		let backend = self.backend().await?;
		let id_field = self.entry.id_field();

		let id = match subject.id().filter(|_| !created) {
			None => {
				let id = RecordId::ObjectId(ObjectId::new());
				subject.set_id(id.clone())?;
				let mut document = self.to_document(&subject)?;
				document.insert(id_field, json_to_bson(&id.to_document_value()));
				for (field, value) in extend.normalize().exact_values() {
					document.insert(field, json_to_bson(value));
				}
				if let Some(field) = self.entry.soft_delete_field() {
					document.insert(field, false);
				}
				tracing::debug!(schema = self.entry.name(), collection = self.collection(), %id, "insert");
				let inserted = backend.insert_one(self.collection(), document).await?;
				record_id_from_bson(&inserted).unwrap_or(id)
			}
			Some(id) => {
				let filter = self.id_filter(&id, extend, include_deleted);
				let mut document = self.to_document(&subject)?;
				if !include_deleted
					&& let Some(field) = self.entry.soft_delete_field()
					&& !document.contains_key(field)
				{
					document.insert(field, false);
				}
				tracing::debug!(schema = self.entry.name(), collection = self.collection(), %filter, "replace");
				let result = backend.replace_one(self.collection(), filter, document).await?;
				if result.matched_count == 0 {
					return Err(OdimError::NotModified {
						schema: self.entry.name().to_string(),
						id: id.to_string(),
					});
				}
				id
			}
		};

		let subject = hooks
			.run_instance(HookEvent::PostSave, subject, HookContext::saving(self.entry.name(), created))
			.await?;
		*instance = subject;
		Ok(id)
	}

	async fn update(
		&self,
		instance: &mut M,
		extend: &Query,
		include_deleted: bool,
		only_fields: Option<&[String]>,
	) -> Result<WriteResult> {
		if instance.id().is_none() {
			return Err(OdimError::Validation(format!(
				"cannot update a {} that has no identifier",
				self.entry.name()
			)));
		}
		let hooks = self.entry.hooks();
		let ctx = HookContext::saving(self.entry.name(), false);
		let subject = hooks.run_instance(HookEvent::PreSave, instance.clone(), ctx.clone()).await?;
		let id = subject.id().ok_or_else(|| {
			OdimError::Validation(format!("pre_save hook removed the {} identifier", self.entry.name()))
		})?;

		let id_field = self.entry.id_field();
		let changes: Document = self
			.to_document(&subject)?
			.into_iter()
			.filter(|(field, value)| field != id_field && !matches!(value, Bson::Null))
			.filter(|(field, _)| only_fields.is_none_or(|only| only.iter().any(|f| f == field)))
			.collect();

		let result = if changes.is_empty() {
			tracing::debug!(schema = self.entry.name(), %id, "update skipped: nothing to write");
			WriteResult::default()
		} else {
			let filter = self.id_filter(&id, extend, include_deleted);
			tracing::debug!(schema = self.entry.name(), collection = self.collection(), %filter, "update");
			let backend = self.backend().await?;
			let result = backend
				.update_one(self.collection(), filter, doc! { "$set": changes })
				.await?;
			WriteResult::new(result.matched_count, result.modified_count)
		};

		let subject = hooks.run_instance(HookEvent::PostSave, subject, ctx).await?;
		*instance = subject;
		Ok(result)
	}

	async fn find(&self, query: &Query, params: Option<&SearchParams>, include_deleted: bool) -> Result<Vec<M>> {
		let filter = self.find_filter(query, include_deleted);
		let options = match params {
			Some(params) => render_page(params)?,
			None => FindOptions::default(),
		};
		tracing::debug!(schema = self.entry.name(), collection = self.collection(), %filter, ?options, "find");

		let backend = self.backend().await?;
		let documents = with_retries(self.entry.retry(), "find", || {
			backend.find_many(self.collection(), filter.clone(), options.clone())
		})
		.await?;

		let mut results = Vec::with_capacity(documents.len());
		for document in documents {
			results.push(self.materialize(document).await?);
		}
		Ok(results)
	}

	async fn count(&self, query: &Query, include_deleted: bool) -> Result<u64> {
		let filter = self.find_filter(query, include_deleted);
		tracing::debug!(schema = self.entry.name(), collection = self.collection(), %filter, "count");

		let backend = self.backend().await?;
		with_retries(self.entry.retry(), "count", || {
			backend.count_documents(self.collection(), filter.clone())
		})
		.await
	}

	async fn delete(&self, target: DeleteTarget<'_, M>, extend: &Query, force_harddelete: bool) -> Result<WriteResult> {
		let id = match target {
			DeleteTarget::Id(id) => id,
			DeleteTarget::Instance(instance) => instance.id().ok_or_else(|| {
				OdimError::Validation(format!("cannot delete a {} that has no identifier", self.entry.name()))
			})?,
		};
		let filter = self.id_filter(&id, extend, true);
		let soft_field = self.entry.soft_delete_field().filter(|_| !force_harddelete);
		let ctx = HookContext::removing(self.entry.name(), soft_field.is_some());
		let hooks = self.entry.hooks();
		let backend = self.backend().await?;

		let subject = if hooks.has_receivers(&[HookEvent::PreRemove, HookEvent::PostRemove]) {
			let document = backend
				.find_one(self.collection(), filter.clone())
				.await?
				.ok_or_else(|| self.not_found(&id))?;
			let loaded = self.materialize(document).await?;
			Some(hooks.run_instance(HookEvent::PreRemove, loaded, ctx.clone()).await?)
		} else {
			None
		};

		tracing::debug!(
			schema = self.entry.name(),
			collection = self.collection(),
			%filter,
			soft = soft_field.is_some(),
			"delete"
		);
		let result = match soft_field {
			Some(field) => {
				let mut changes = Document::new();
				changes.insert(field, true);
				let result = backend
					.update_one(self.collection(), filter, doc! { "$set": changes })
					.await?;
				WriteResult::new(result.matched_count, result.modified_count)
			}
			None => {
				let deleted = backend.delete_one(self.collection(), filter).await?;
				WriteResult::new(deleted, deleted)
			}
		};

		if let Some(subject) = subject {
			hooks.run_instance(HookEvent::PostRemove, subject, ctx).await?;
		}
		Ok(result)
	}
}
