//! Connection registry
//!
//! Pools are opened lazily, one per alias (or raw URI), and shared by every
//! schema bound to it. Creation is serialized per registry so concurrent
//! first uses of an alias open a single pool.

use crate::dispatch::{backend_for_protocol, protocols_for};
use crate::document::{DocumentBackend, MongoBackend};
use crate::error::{OdimError, Result};
use crate::relational::SqlPool;
use crate::schema::Backend;
use odim_conf::{ConnectionParams, Settings};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct ConnectionRegistry {
	settings: Settings,
	sql_pools: RwLock<HashMap<String, SqlPool>>,
	document_backends: RwLock<HashMap<String, Arc<dyn DocumentBackend>>>,
}

impl std::fmt::Debug for ConnectionRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConnectionRegistry")
			.field("aliases", &self.settings.aliases().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}

impl ConnectionRegistry {
	pub fn new(settings: Settings) -> Self {
		Self {
			settings,
			sql_pools: RwLock::new(HashMap::new()),
			document_backends: RwLock::new(HashMap::new()),
		}
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Resolve an alias or URI to connection parameters
	pub fn resolve(&self, alias_or_uri: &str) -> Result<ConnectionParams> {
		Ok(self.settings.connection_params(alias_or_uri)?)
	}

	/// First declared alias whose protocol belongs to `backend`
	pub fn default_alias_for(&self, backend: Backend) -> Result<String> {
		let protocols = protocols_for(backend);
		self.settings
			.first_alias_where(|protocol| protocols.contains(&protocol))
			.map(str::to_string)
			.ok_or_else(|| {
				OdimError::Configuration(format!(
					"missing database definition: no connection with a {} protocol ({}) is declared",
					backend,
					protocols.join(", ")
				))
			})
	}

	/// The SQL pool for `alias`, opening it on first use
	pub async fn sql_pool(&self, alias: &str) -> Result<SqlPool> {
		if let Some(pool) = self.sql_pools.read().await.get(alias) {
			return Ok(pool.clone());
		}

		let mut pools = self.sql_pools.write().await;
		if let Some(pool) = pools.get(alias) {
			return Ok(pool.clone());
		}

		let params = self.resolve(alias)?;
		if backend_for_protocol(&params.protocol) != Some(Backend::Relational) {
			return Err(OdimError::Configuration(format!(
				"connection `{}` uses protocol `{}`, which is not a SQL database",
				alias, params.protocol
			)));
		}

		let pool = SqlPool::connect(&params, &self.settings.pool).await?;
		tracing::info!(alias, url = %params.masked_url(), dialect = %pool.dialect(), "opened SQL pool");
		pools.insert(alias.to_string(), pool.clone());
		Ok(pool)
	}

	/// The document backend for `alias`, connecting on first use
	pub async fn document_backend(&self, alias: &str) -> Result<Arc<dyn DocumentBackend>> {
		if let Some(backend) = self.document_backends.read().await.get(alias) {
			return Ok(Arc::clone(backend));
		}

		let mut backends = self.document_backends.write().await;
		if let Some(backend) = backends.get(alias) {
			return Ok(Arc::clone(backend));
		}

		let mut params = self.resolve(alias)?;
		if backend_for_protocol(&params.protocol) != Some(Backend::Document) {
			return Err(OdimError::Configuration(format!(
				"connection `{}` uses protocol `{}`, which is not a document store",
				alias, params.protocol
			)));
		}
		if params.protocol == "mongo" {
			params.protocol = "mongodb".to_string();
		}

		let backend: Arc<dyn DocumentBackend> = Arc::new(MongoBackend::connect(&params, &self.settings.pool).await?);
		backends.insert(alias.to_string(), Arc::clone(&backend));
		Ok(backend)
	}

	/// Serve `alias` from the given backend instead of connecting
	///
	/// Replaces any backend already registered for the alias.
	pub async fn install_document_backend(&self, alias: impl Into<String>, backend: Arc<dyn DocumentBackend>) {
		self.document_backends.write().await.insert(alias.into(), backend);
	}

	/// Close every open pool and client
	pub async fn close_all(&self) {
		let pools: Vec<_> = self.sql_pools.write().await.drain().collect();
		for (alias, pool) in pools {
			pool.close().await;
			tracing::debug!(alias, "closed SQL pool");
		}

		let backends: Vec<_> = self.document_backends.write().await.drain().collect();
		for (alias, backend) in backends {
			backend.close().await;
			tracing::debug!(alias, "closed document backend");
		}
	}
}
