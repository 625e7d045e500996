//! The application-wide entry point
//!
//! An [`Odim`] owns the connection registry and, per schema type, the
//! resolved dispatch entry, its hook registry and its driver. Schemas are
//! resolved once, on first use or on explicit [`Odim::register`].

use crate::connection::ConnectionRegistry;
use crate::dispatch::{SchemaEntry, build_driver};
use crate::document::DocumentBackend;
use crate::driver::Driver;
use crate::error::{OdimError, Result};
use crate::manager::Manager;
use crate::schema::{Backend, Schema};
use odim_conf::Settings;
use odim_signals::HookRegistry;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// A resolved schema and the driver serving it
pub(crate) struct Registered<M: Schema> {
	pub(crate) entry: Arc<SchemaEntry<M>>,
	pub(crate) driver: Arc<dyn Driver<M>>,
}

impl<M: Schema> Clone for Registered<M> {
	fn clone(&self) -> Self {
		Self {
			entry: Arc::clone(&self.entry),
			driver: Arc::clone(&self.driver),
		}
	}
}

pub struct Odim {
	connections: Arc<ConnectionRegistry>,
	schemas: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl std::fmt::Debug for Odim {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Odim")
			.field("connections", &self.connections)
			.field("schemas", &self.schemas.read().len())
			.finish()
	}
}

impl Odim {
	pub fn new(settings: Settings) -> Self {
		Self::with_registry(Arc::new(ConnectionRegistry::new(settings)))
	}

	/// Share an existing connection registry
	pub fn with_registry(connections: Arc<ConnectionRegistry>) -> Self {
		Self {
			connections,
			schemas: RwLock::new(HashMap::new()),
		}
	}

	pub fn connections(&self) -> &Arc<ConnectionRegistry> {
		&self.connections
	}

	/// Resolve `M`'s backend and build its driver
	///
	/// Registering twice is a no-op; the first resolution is kept.
	pub fn register<M: Schema>(&self) -> Result<()> {
		self.registered::<M>().map(|_| ())
	}

	/// Backend `M` resolved to
	pub fn backend_of<M: Schema>(&self) -> Result<Backend> {
		Ok(self.registered::<M>()?.entry.backend())
	}

	pub fn hooks<M: Schema>(&self) -> Result<Arc<HookRegistry<M>>> {
		Ok(Arc::clone(self.registered::<M>()?.entry.hooks()))
	}

	pub fn driver<M: Schema>(&self) -> Result<Arc<dyn Driver<M>>> {
		Ok(self.registered::<M>()?.driver)
	}

	/// Type-bound operations on `M`
	pub fn objects<M: Schema>(&self) -> Result<Manager<M>> {
		let registered = self.registered::<M>()?;
		Ok(Manager::new(registered.entry, registered.driver))
	}

	/// Serve `alias` from `backend` instead of connecting to MongoDB
	pub async fn install_document_backend(&self, alias: impl Into<String>, backend: Arc<dyn DocumentBackend>) {
		self.connections.install_document_backend(alias, backend).await;
	}

	/// Close every pool and client opened so far
	pub async fn shutdown(&self) {
		self.connections.close_all().await;
		tracing::info!("closed all connections");
	}

	fn registered<M: Schema>(&self) -> Result<Registered<M>> {
		let key = TypeId::of::<M>();
		if let Some(slot) = self.schemas.read().get(&key) {
			return downcast::<M>(slot);
		}

		let mut schemas = self.schemas.write();
		if let Some(slot) = schemas.get(&key) {
			return downcast::<M>(slot);
		}

		let entry = Arc::new(SchemaEntry::<M>::resolve(M::meta(), &self.connections)?);
		let driver = build_driver(Arc::clone(&entry), Arc::clone(&self.connections))?;
		let registered = Registered { entry, driver };
		schemas.insert(key, Arc::new(registered.clone()));
		Ok(registered)
	}
}

fn downcast<M: Schema>(slot: &Arc<dyn Any + Send + Sync>) -> Result<Registered<M>> {
	slot.downcast_ref::<Registered<M>>()
		.cloned()
		.ok_or_else(|| OdimError::Configuration(format!("schema slot for {} holds another type", M::meta().name())))
}
