//! Process-wide settings
//!
//! The `databases` table maps a logical alias to either a URI string or a
//! parameter object. Aliases keep their declaration order, which matters
//! when a schema falls back to the first connection of a matching protocol.

use crate::connection::ConnectionParams;
use crate::error::{ConfigError, ConfigResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the `databases` table as JSON
pub const DATABASES_ENV: &str = "DATABASES";

/// One entry of the `databases` table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatabaseEntry {
	Uri(String),
	Params(ConnectionParams),
}

impl DatabaseEntry {
	/// Resolve the entry to connection parameters
	pub fn params(&self, alias: &str) -> ConfigResult<ConnectionParams> {
		match self {
			DatabaseEntry::Uri(uri) => ConnectionParams::parse(uri),
			DatabaseEntry::Params(params) => {
				let mut params = params.clone();
				params.protocol = params.protocol.to_ascii_lowercase();
				params.validate(alias)?;
				Ok(params)
			}
		}
	}
}

impl From<&str> for DatabaseEntry {
	fn from(uri: &str) -> Self {
		DatabaseEntry::Uri(uri.to_string())
	}
}

impl From<String> for DatabaseEntry {
	fn from(uri: String) -> Self {
		DatabaseEntry::Uri(uri)
	}
}

impl From<ConnectionParams> for DatabaseEntry {
	fn from(params: ConnectionParams) -> Self {
		DatabaseEntry::Params(params)
	}
}

/// Connection pool sizing shared by every backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
	pub max_connections: u32,
	pub min_connections: u32,
	pub acquire_timeout_secs: u64,
	pub idle_timeout_secs: Option<u64>,
	pub max_lifetime_secs: Option<u64>,
}

impl Default for PoolSettings {
	fn default() -> Self {
		Self {
			max_connections: 10,
			min_connections: 1,
			acquire_timeout_secs: 30,
			idle_timeout_secs: Some(600),
			max_lifetime_secs: Some(1800),
		}
	}
}

impl PoolSettings {
	pub fn with_max_connections(mut self, max: u32) -> Self {
		self.max_connections = max;
		self
	}

	pub fn with_min_connections(mut self, min: u32) -> Self {
		self.min_connections = min;
		self
	}

	pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
		self.acquire_timeout_secs = timeout.as_secs();
		self
	}

	pub fn acquire_timeout(&self) -> Duration {
		Duration::from_secs(self.acquire_timeout_secs)
	}

	pub fn idle_timeout(&self) -> Option<Duration> {
		self.idle_timeout_secs.map(Duration::from_secs)
	}

	pub fn max_lifetime(&self) -> Option<Duration> {
		self.max_lifetime_secs.map(Duration::from_secs)
	}

	pub fn validate(&self) -> ConfigResult<()> {
		if self.max_connections == 0 {
			return Err(ConfigError::Parse {
				format: "pool",
				message: "max_connections must be greater than 0".to_string(),
			});
		}
		if self.min_connections > self.max_connections {
			return Err(ConfigError::Parse {
				format: "pool",
				message: "min_connections cannot exceed max_connections".to_string(),
			});
		}
		Ok(())
	}
}

/// Retry policy for read operations hitting transient failures
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Retries after the first attempt
	pub attempts: u32,
	/// Fixed pause between attempts, in milliseconds
	pub delay_ms: u64,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			attempts: 5,
			delay_ms: 200,
		}
	}
}

impl RetryPolicy {
	pub fn new(attempts: u32, delay: Duration) -> Self {
		Self {
			attempts,
			delay_ms: delay.as_millis() as u64,
		}
	}

	/// Fail on the first error
	pub fn disabled() -> Self {
		Self {
			attempts: 0,
			delay_ms: 0,
		}
	}

	pub fn delay(&self) -> Duration {
		Duration::from_millis(self.delay_ms)
	}
}

/// Top-level settings
///
/// # Examples
///
/// ```
/// use odim_conf::Settings;
///
/// let settings = Settings::from_toml_str(r#"
/// [databases]
/// default = "mongodb://localhost:27017/app"
/// reports = { protocol = "sqlite", database = ":memory:" }
///
/// [retry]
/// attempts = 2
/// "#).unwrap();
///
/// assert_eq!(settings.aliases().collect::<Vec<_>>(), ["default", "reports"]);
/// assert_eq!(settings.retry.attempts, 2);
/// assert_eq!(settings.pool.max_connections, 10);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	#[serde(alias = "DATABASES")]
	pub databases: IndexMap<String, DatabaseEntry>,
	pub pool: PoolSettings,
	pub retry: RetryPolicy,
}

impl Settings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_database(mut self, alias: impl Into<String>, entry: impl Into<DatabaseEntry>) -> Self {
		self.databases.insert(alias.into(), entry.into());
		self
	}

	pub fn with_pool(mut self, pool: PoolSettings) -> Self {
		self.pool = pool;
		self
	}

	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
		let settings: Self = toml::from_str(source).map_err(|e| ConfigError::Parse {
			format: "toml",
			message: e.to_string(),
		})?;
		settings.pool.validate()?;
		Ok(settings)
	}

	pub fn from_json_str(source: &str) -> ConfigResult<Self> {
		let settings: Self = serde_json::from_str(source).map_err(|e| ConfigError::Parse {
			format: "json",
			message: e.to_string(),
		})?;
		settings.pool.validate()?;
		Ok(settings)
	}

	/// Load settings from a `.toml` or `.json` file
	pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path)?;
		match path.extension().and_then(|ext| ext.to_str()) {
			Some("json") => Self::from_json_str(&source),
			_ => Self::from_toml_str(&source),
		}
	}

	/// Build settings from the `DATABASES` environment variable
	///
	/// The variable holds a JSON object of alias to URI or parameter object.
	/// Pool and retry settings keep their defaults.
	pub fn from_env() -> ConfigResult<Self> {
		let raw = std::env::var(DATABASES_ENV)
			.map_err(|_| ConfigError::MissingSetting(DATABASES_ENV.to_string()))?;
		let databases = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
			format: "json",
			message: format!("{}: {}", DATABASES_ENV, e),
		})?;
		Ok(Self {
			databases,
			..Self::default()
		})
	}

	/// Declared aliases in declaration order
	pub fn aliases(&self) -> impl Iterator<Item = &str> {
		self.databases.keys().map(String::as_str)
	}

	/// Resolve an alias or a raw URI to connection parameters
	///
	/// A declared alias wins. Anything else that looks like a URI is parsed
	/// directly.
	pub fn connection_params(&self, alias_or_uri: &str) -> ConfigResult<ConnectionParams> {
		match self.databases.get(alias_or_uri) {
			Some(entry) => entry.params(alias_or_uri),
			None if alias_or_uri.contains(':') => ConnectionParams::parse(alias_or_uri),
			None => Err(ConfigError::UnknownAlias(alias_or_uri.to_string())),
		}
	}

	/// First alias, in declaration order, whose protocol is accepted
	///
	/// Entries that fail to resolve are skipped.
	pub fn first_alias_where(&self, accepts: impl Fn(&str) -> bool) -> Option<&str> {
		self.databases.iter().find_map(|(alias, entry)| match entry.params(alias) {
			Ok(params) if accepts(&params.protocol) => Some(alias.as_str()),
			Ok(_) => None,
			Err(err) => {
				tracing::warn!(alias = %alias, error = %err, "skipping unusable connection entry");
				None
			}
		})
	}
}
