//! Relational driver over the typed SQL pools

use super::builder::{SqlBuilder, Statement};
use super::dialect::SqlDialect;
use super::pool::SqlPool;
use super::row::coerce_record;
use crate::connection::ConnectionRegistry;
use crate::dispatch::SchemaEntry;
use crate::driver::{DeleteTarget, Driver, WriteResult};
use crate::error::{OdimError, Result};
use crate::query::Query;
use crate::retry::with_retries;
use crate::schema::{Backend, FieldType, RecordId, Schema};
use crate::search::SearchParams;
use async_trait::async_trait;
use odim_signals::{HookContext, HookEvent, Record};
use serde_json::Value;
use std::sync::Arc;

pub struct SqlDriver<M: Schema> {
	entry: Arc<SchemaEntry<M>>,
	connections: Arc<ConnectionRegistry>,
	dialect: SqlDialect,
}

impl<M: Schema> SqlDriver<M> {
	pub fn new(entry: Arc<SchemaEntry<M>>, connections: Arc<ConnectionRegistry>, dialect: SqlDialect) -> Self {
		Self {
			entry,
			connections,
			dialect,
		}
	}

	pub fn dialect(&self) -> SqlDialect {
		self.dialect
	}

	async fn pool(&self) -> Result<SqlPool> {
		self.connections.sql_pool(self.entry.connection()).await
	}

	fn builder(&self) -> Result<SqlBuilder> {
		SqlBuilder::new(self.dialect, self.entry.meta().physical_name())
	}

	fn log(&self, statement: &Statement) {
		tracing::debug!(
			schema = self.entry.name(),
			dialect = %self.dialect,
			sql = %statement.sql,
			params = statement.values.0.len(),
			"executing SQL"
		);
	}

	fn id_filter(&self, id: &RecordId, extend: &Query, include_deleted: bool) -> Query {
		let mut query = Query::new().filter(self.entry.id_field(), id.to_sql_value());
		if !include_deleted && let Some(field) = self.entry.soft_delete_field() {
			query.insert(field, false);
		}
		query.extend(extend);
		query
	}

	fn find_filter(&self, query: &Query, include_deleted: bool) -> Query {
		let mut full = Query::new();
		if !include_deleted && let Some(field) = self.entry.soft_delete_field() {
			full.insert(field, false);
		}
		full.extend(query);
		full
	}

	fn column_type(&self, column: &str) -> FieldType {
		match self.entry.meta().field_type(column) {
			FieldType::Any if self.entry.soft_delete_field() == Some(column) => FieldType::Bool,
			declared => declared,
		}
	}

	async fn materialize(&self, row: Record) -> Result<M> {
		let mut record = coerce_record(row, |column| self.column_type(column))?;
		if self.entry.wants_raw_record() {
			record = self.entry.before_construct(record).await?;
		}
		let instance: M = serde_json::from_value(Value::Object(record))?;
		self.entry.after_construct(instance).await
	}

	fn to_record(&self, instance: &M) -> Result<Record> {
		match serde_json::to_value(instance)? {
			Value::Object(record) => Ok(record),
			other => Err(OdimError::Serialization(format!(
				"{} serialized to {} instead of an object",
				self.entry.name(),
				other
			))),
		}
	}

	fn not_found(&self, id: &RecordId) -> OdimError {
		OdimError::not_found(self.entry.name(), format!("{} = {}", self.entry.id_field(), id))
	}

	async fn execute(&self, pool: &SqlPool, statement: &Statement) -> Result<u64> {
		self.log(statement);
		pool.execute(statement).await
	}

	async fn fetch_by_id(&self, pool: &SqlPool, id: &RecordId, extend: &Query, include_deleted: bool) -> Result<M> {
		let filter = self.id_filter(id, extend, include_deleted).normalize();
		let statement = self.builder()?.select(&filter, &[], 1, 0)?;
		self.log(&statement);
		let row = pool.fetch_optional(&statement).await?.ok_or_else(|| self.not_found(id))?;
		self.materialize(row).await
	}

	/// Insert a new row and return its generated key
	async fn insert(&self, pool: &SqlPool, record: &Record) -> Result<RecordId> {
		let returning = Some(self.entry.id_field()).filter(|_| self.dialect.supports_returning());
		let statement = self.builder()?.insert(record, returning)?;
		self.log(&statement);
		pool.insert(&statement)
			.await?
			.map(RecordId::Int)
			.ok_or_else(|| OdimError::Backend(format!("{} insert did not report a generated key", self.entry.name())))
	}
}

#[async_trait]
impl<M: Schema> Driver<M> for SqlDriver<M> {
	fn backend(&self) -> Backend {
		Backend::Relational
	}

	async fn get(&self, id: &RecordId, extend: &Query, include_deleted: bool) -> Result<M> {
		let pool = self.pool().await?;
		self.fetch_by_id(&pool, id, extend, include_deleted).await
	}

	async fn save(&self, instance: &mut M, extend: &Query, include_deleted: bool) -> Result<RecordId> {
		let created = instance.id().is_none();
		let hooks = self.entry.hooks();
		let mut subject = hooks
			.run_instance(HookEvent::PreSave, instance.clone(), HookContext::saving(self.entry.name(), created))
			.await?;
		let pool = self.pool().await?;
		let id_field = self.entry.id_field();

		let id = match subject.id().filter(|_| !created) {
			None => {
				let mut record = self.to_record(&subject)?;
				record.remove(id_field);
				for (field, value) in extend.normalize().exact_values() {
					record.insert(field.to_string(), value.clone());
				}
				if let Some(field) = self.entry.soft_delete_field() {
					record.insert(field.to_string(), Value::Bool(false));
				}
				let id = self.insert(&pool, &record).await?;
				subject.set_id(id.clone())?;
				id
			}
			Some(id) => {
				let mut record = self.to_record(&subject)?;
				record.remove(id_field);
				let filter = self.id_filter(&id, extend, include_deleted).normalize();
				let statement = self.builder()?.update(&record, &filter)?;
				if self.execute(&pool, &statement).await? == 0 {
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
		let changes: Record = self
			.to_record(&subject)?
			.into_iter()
			.filter(|(field, value)| field != id_field && !value.is_null())
			.filter(|(field, _)| only_fields.is_none_or(|only| only.iter().any(|f| f == field)))
			.collect();

		let result = if changes.is_empty() {
			tracing::debug!(schema = self.entry.name(), %id, "update skipped: nothing to write");
			WriteResult::default()
		} else {
			let filter = self.id_filter(&id, extend, include_deleted).normalize();
			let statement = self.builder()?.update(&changes, &filter)?;
			let pool = self.pool().await?;
			let affected = self.execute(&pool, &statement).await?;
			WriteResult::new(affected, affected)
		};

		let subject = hooks.run_instance(HookEvent::PostSave, subject, ctx).await?;
		*instance = subject;
		Ok(result)
	}

	async fn find(&self, query: &Query, params: Option<&SearchParams>, include_deleted: bool) -> Result<Vec<M>> {
		let filter = self.find_filter(query, include_deleted).normalize();
		let statement = match params {
			Some(params) => self
				.builder()?
				.select(&filter, &params.sort_fields()?, params.limit, params.offset)?,
			None => self.builder()?.select(&filter, &[], 0, 0)?,
		};
		self.log(&statement);

		let pool = self.pool().await?;
		let rows = with_retries(self.entry.retry(), "find", || pool.fetch_all(&statement)).await?;

		let mut results = Vec::with_capacity(rows.len());
		for row in rows {
			results.push(self.materialize(row).await?);
		}
		Ok(results)
	}

	async fn count(&self, query: &Query, include_deleted: bool) -> Result<u64> {
		let filter = self.find_filter(query, include_deleted).normalize();
		let statement = self.builder()?.count(&filter)?;
		self.log(&statement);

		let pool = self.pool().await?;
		let row = with_retries(self.entry.retry(), "count", || pool.fetch_optional(&statement)).await?;
		Ok(row
			.and_then(|row| row.get("cnt").and_then(Value::as_u64))
			.unwrap_or_default())
	}

	async fn delete(&self, target: DeleteTarget<'_, M>, extend: &Query, force_harddelete: bool) -> Result<WriteResult> {
		let id = match target {
			DeleteTarget::Id(id) => id,
			DeleteTarget::Instance(instance) => instance.id().ok_or_else(|| {
				OdimError::Validation(format!("cannot delete a {} that has no identifier", self.entry.name()))
			})?,
		};
		let soft_field = self.entry.soft_delete_field().filter(|_| !force_harddelete);
		let ctx = HookContext::removing(self.entry.name(), soft_field.is_some());
		let hooks = self.entry.hooks();
		let pool = self.pool().await?;

		let subject = if hooks.has_receivers(&[HookEvent::PreRemove, HookEvent::PostRemove]) {
			let loaded = self.fetch_by_id(&pool, &id, extend, true).await?;
			Some(hooks.run_instance(HookEvent::PreRemove, loaded, ctx.clone()).await?)
		} else {
			None
		};

		let filter = self.id_filter(&id, extend, true).normalize();
		let builder = self.builder()?;
		let statement = match soft_field {
			Some(field) => {
				let mut changes = Record::new();
				changes.insert(field.to_string(), Value::Bool(true));
				builder.update(&changes, &filter)?
			}
			None => builder.delete(&filter)?,
		};
		let affected = self.execute(&pool, &statement).await?;

		if let Some(subject) = subject {
			hooks.run_instance(HookEvent::PostRemove, subject, ctx).await?;
		}
		Ok(WriteResult::new(affected, affected))
	}
}
