//! Driver dispatch
//!
//! A schema is resolved to a backend once, when it is first used:
//!
//! 1. if it names a connection, the connection's protocol picks the driver;
//! 2. otherwise its declared base (document or relational) picks the
//!    driver, and the first declared connection with a matching protocol
//!    is used;
//! 3. otherwise resolution fails.

use crate::connection::ConnectionRegistry;
use crate::document::DocumentDriver;
use crate::driver::Driver;
use crate::error::{OdimError, Result};
use crate::relational::{SqlDialect, SqlDriver};
use crate::schema::{Backend, Schema, SchemaMeta};
use odim_conf::RetryPolicy;
use odim_signals::{HookContext, HookEvent, HookRegistry, Record};
use std::sync::Arc;

/// A driver family and the URI schemes it serves
#[derive(Debug, Clone, Copy)]
pub struct DriverSpec {
	pub backend: Backend,
	pub protocols: &'static [&'static str],
}

pub static DRIVERS: &[DriverSpec] = &[
	DriverSpec {
		backend: Backend::Document,
		protocols: &["mongo", "mongodb", "mongodb+srv"],
	},
	DriverSpec {
		backend: Backend::Relational,
		protocols: &["mysql", "postgres", "postgresql", "sqlite"],
	},
];

pub fn backend_for_protocol(protocol: &str) -> Option<Backend> {
	DRIVERS
		.iter()
		.find(|spec| spec.protocols.contains(&protocol))
		.map(|spec| spec.backend)
}

pub fn protocols_for(backend: Backend) -> &'static [&'static str] {
	DRIVERS
		.iter()
		.find(|spec| spec.backend == backend)
		.map(|spec| spec.protocols)
		.unwrap_or(&[])
}

/// Everything resolved about one schema
pub struct SchemaEntry<M: Schema> {
	meta: SchemaMeta,
	backend: Backend,
	connection: String,
	protocol: String,
	retry: RetryPolicy,
	hooks: Arc<HookRegistry<M>>,
}

impl<M: Schema> SchemaEntry<M> {
	pub fn resolve(meta: SchemaMeta, connections: &ConnectionRegistry) -> Result<Self> {
		let (backend, connection) = match (meta.binding(), meta.base()) {
			(Some(binding), _) => {
				let params = connections.resolve(binding.as_str())?;
				let backend = backend_for_protocol(&params.protocol).ok_or_else(|| {
					OdimError::Configuration(format!(
						"no driver serves protocol `{}` used by schema `{}`",
						params.protocol,
						meta.name()
					))
				})?;
				if let Some(base) = meta.base()
					&& base != backend
				{
					return Err(OdimError::Configuration(format!(
						"schema `{}` is declared {} but bound to a {} connection",
						meta.name(),
						base,
						backend
					)));
				}
				(backend, binding.as_str().to_string())
			}
			(None, Some(base)) => (base, connections.default_alias_for(base)?),
			(None, None) => {
				return Err(OdimError::Configuration(format!(
					"schema `{}` names no connection and declares no backend",
					meta.name()
				)));
			}
		};
		let protocol = connections.resolve(&connection)?.protocol;

		tracing::debug!(
			schema = meta.name(),
			%backend,
			connection = %odim_conf::mask_url_password(&connection),
			"resolved schema"
		);
		Ok(Self {
			meta,
			backend,
			connection,
			protocol,
			retry: connections.settings().retry.clone(),
			hooks: Arc::new(HookRegistry::new()),
		})
	}

	pub fn meta(&self) -> &SchemaMeta {
		&self.meta
	}

	pub fn name(&self) -> &'static str {
		self.meta.name()
	}

	pub fn backend(&self) -> Backend {
		self.backend
	}

	/// Alias or URI the schema's pool is keyed by
	pub fn connection(&self) -> &str {
		&self.connection
	}

	pub fn protocol(&self) -> &str {
		&self.protocol
	}

	pub fn retry(&self) -> &RetryPolicy {
		&self.retry
	}

	pub fn hooks(&self) -> &Arc<HookRegistry<M>> {
		&self.hooks
	}

	pub fn id_field(&self) -> &str {
		self.meta.id_field_for(self.backend)
	}

	pub fn soft_delete_field(&self) -> Option<&str> {
		self.meta.soft_delete_field()
	}

	/// Whether any hook wants to see the raw record before construction
	pub(crate) fn wants_raw_record(&self) -> bool {
		self.hooks
			.has_receivers(&[HookEvent::PreInit, HookEvent::PreValidate])
	}

	/// Run `pre_init` then `pre_validate` over a raw record
	pub(crate) async fn before_construct(&self, record: Record) -> Result<Record> {
		let ctx = HookContext::new(self.name());
		let record = self.hooks.run_record(HookEvent::PreInit, record, ctx.clone()).await?;
		Ok(self.hooks.run_record(HookEvent::PreValidate, record, ctx).await?)
	}

	/// Run `post_validate` then `post_init` over a new instance
	pub(crate) async fn after_construct(&self, instance: M) -> Result<M> {
		let ctx = HookContext::new(self.name());
		let instance = self.hooks.run_instance(HookEvent::PostValidate, instance, ctx.clone()).await?;
		Ok(self.hooks.run_instance(HookEvent::PostInit, instance, ctx).await?)
	}

	/// Build an instance from a raw record with only the validation hooks
	pub(crate) async fn construct(&self, record: Record) -> Result<M> {
		let ctx = HookContext::new(self.name());
		let record = self.hooks.run_record(HookEvent::PreValidate, record, ctx.clone()).await?;
		let instance: M = serde_json::from_value(serde_json::Value::Object(record))?;
		Ok(self.hooks.run_instance(HookEvent::PostValidate, instance, ctx).await?)
	}
}

/// Build the driver for a resolved schema
pub fn build_driver<M: Schema>(entry: Arc<SchemaEntry<M>>, connections: Arc<ConnectionRegistry>) -> Result<Arc<dyn Driver<M>>> {
	match entry.backend() {
		Backend::Document => Ok(Arc::new(DocumentDriver::new(entry, connections))),
		Backend::Relational => {
			let dialect = SqlDialect::for_protocol(entry.protocol()).ok_or_else(|| {
				OdimError::Configuration(format!("no SQL dialect for protocol `{}`", entry.protocol()))
			})?;
			Ok(Arc::new(SqlDriver::new(entry, connections, dialect)))
		}
	}
}
