//! MongoDB implementation of [`DocumentBackend`]

use super::backend::{DocumentBackend, FindOptions, UpdateResult};
use crate::error::{OdimError, Result};
use async_trait::async_trait;
use bson::{Bson, Document};
use futures::stream::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use odim_conf::{ConnectionParams, PoolSettings};

/// A pooled MongoDB client bound to one database
#[derive(Clone, Debug)]
pub struct MongoBackend {
	client: Client,
	database_name: String,
}

impl MongoBackend {
	/// Open a client for the given connection
	///
	/// The database comes from the connection's `database` part; a MongoDB
	/// connection without one is rejected.
	pub async fn connect(params: &ConnectionParams, pool: &PoolSettings) -> Result<Self> {
		let database_name = params
			.database
			.clone()
			.filter(|db| !db.is_empty())
			.ok_or_else(|| {
				OdimError::Configuration(format!(
					"MongoDB connection `{}` does not name a database",
					params.masked_url()
				))
			})?;

		let mut options = ClientOptions::parse(params.to_url(false)).await?;
		options.max_pool_size = Some(pool.max_connections);
		options.min_pool_size = Some(pool.min_connections);
		options.max_idle_time = pool.idle_timeout();
		options.connect_timeout = Some(pool.acquire_timeout());
		options.server_selection_timeout = Some(pool.acquire_timeout());

		let client = Client::with_options(options)?;
		tracing::info!(url = %params.masked_url(), database = %database_name, "opened MongoDB client");

		Ok(Self {
			client,
			database_name,
		})
	}

	fn collection(&self, name: &str) -> Collection<Document> {
		self.client.database(&self.database_name).collection::<Document>(name)
	}
}

#[async_trait]
impl DocumentBackend for MongoBackend {
	fn database_name(&self) -> &str {
		&self.database_name
	}

	async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
		Ok(self.collection(collection).find_one(filter).await?)
	}

	async fn find_many(&self, collection: &str, filter: Document, options: FindOptions) -> Result<Vec<Document>> {
		let mut mongo_options = mongodb::options::FindOptions::default();
		mongo_options.skip = options.skip;
		mongo_options.limit = options.limit;
		mongo_options.sort = options.sort;

		let cursor = self
			.collection(collection)
			.find(filter)
			.with_options(mongo_options)
			.await?;
		Ok(cursor.try_collect().await?)
	}

	async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson> {
		let result = self.collection(collection).insert_one(document).await?;
		Ok(result.inserted_id)
	}

	async fn replace_one(&self, collection: &str, filter: Document, replacement: Document) -> Result<UpdateResult> {
		let result = self.collection(collection).replace_one(filter, replacement).await?;
		Ok(UpdateResult::new(result.matched_count, result.modified_count))
	}

	async fn update_one(&self, collection: &str, filter: Document, update: Document) -> Result<UpdateResult> {
		let result = self.collection(collection).update_one(filter, update).await?;
		Ok(UpdateResult::new(result.matched_count, result.modified_count))
	}

	async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
		let result = self.collection(collection).delete_one(filter).await?;
		Ok(result.deleted_count)
	}

	async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
		Ok(self.collection(collection).count_documents(filter).await?)
	}

	async fn close(&self) {
		self.client.clone().shutdown().await;
	}
}
