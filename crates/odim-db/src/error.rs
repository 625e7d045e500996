//! Error type shared by every driver

use odim_conf::ConfigError;
use odim_signals::HookError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OdimError {
	/// No record matched an identifier lookup
	#[error("{schema} not found: {detail}")]
	NotFound { schema: String, detail: String },

	/// Settings, bindings or dispatch could not be resolved
	#[error("configuration error: {0}")]
	Configuration(String),

	/// Input was rejected before reaching the store
	#[error("validation error: {0}")]
	Validation(String),

	/// The store was unreachable or dropped the connection
	#[error("transient backend error: {0}")]
	Transient(String),

	/// Any other failure reported by the store
	#[error("backend error: {0}")]
	Backend(String),

	/// A save of an existing record matched nothing
	#[error("{schema} {id} was not modified: no record matched the write filter")]
	NotModified { schema: String, id: String },

	/// Conversion between records and instances failed
	#[error("serialization error: {0}")]
	Serialization(String),

	#[error(transparent)]
	Hook(#[from] HookError),
}

impl OdimError {
	pub fn not_found(schema: impl Into<String>, detail: impl Into<String>) -> Self {
		OdimError::NotFound {
			schema: schema.into(),
			detail: detail.into(),
		}
	}

	/// Whether retrying the same read could succeed
	pub fn is_transient(&self) -> bool {
		matches!(self, OdimError::Transient(_))
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, OdimError::NotFound { .. })
	}
}

pub type Result<T> = std::result::Result<T, OdimError>;

impl From<ConfigError> for OdimError {
	fn from(err: ConfigError) -> Self {
		OdimError::Configuration(err.to_string())
	}
}

impl From<sqlx::Error> for OdimError {
	fn from(err: sqlx::Error) -> Self {
		match err {
			sqlx::Error::Io(_)
			| sqlx::Error::PoolTimedOut
			| sqlx::Error::PoolClosed
			| sqlx::Error::WorkerCrashed
			| sqlx::Error::Protocol(_) => OdimError::Transient(err.to_string()),
			sqlx::Error::Configuration(_) => OdimError::Configuration(err.to_string()),
			sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::Encode(_) => {
				OdimError::Serialization(err.to_string())
			}
			_ => OdimError::Backend(err.to_string()),
		}
	}
}

impl From<mongodb::error::Error> for OdimError {
	fn from(err: mongodb::error::Error) -> Self {
		use mongodb::error::ErrorKind;

		match *err.kind {
			ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::ConnectionPoolCleared { .. } => {
				OdimError::Transient(err.to_string())
			}
			ErrorKind::InvalidArgument { .. } => OdimError::Configuration(err.to_string()),
			ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
				OdimError::Serialization(err.to_string())
			}
			_ => OdimError::Backend(err.to_string()),
		}
	}
}

// bson 3 folds ser and de errors into one type
impl From<bson::error::Error> for OdimError {
	fn from(err: bson::error::Error) -> Self {
		OdimError::Serialization(err.to_string())
	}
}

impl From<serde_json::Error> for OdimError {
	fn from(err: serde_json::Error) -> Self {
		OdimError::Serialization(err.to_string())
	}
}
