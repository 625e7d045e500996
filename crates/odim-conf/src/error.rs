//! Configuration errors

use thiserror::Error;

/// Errors raised while loading settings or resolving a connection
#[derive(Debug, Error)]
pub enum ConfigError {
	/// A connection URI could not be parsed
	#[error("invalid connection URI `{uri}`: {reason}")]
	InvalidUri { uri: String, reason: String },

	/// An alias was requested that is not declared in the settings
	#[error("unknown connection alias `{0}`")]
	UnknownAlias(String),

	/// A connection entry is missing a required part
	#[error("incomplete connection `{alias}`: {reason}")]
	IncompleteConnection { alias: String, reason: String },

	/// A required setting was not provided
	#[error("missing setting `{0}`")]
	MissingSetting(String),

	/// A settings document failed to parse
	#[error("failed to parse {format} settings: {message}")]
	Parse {
		format: &'static str,
		message: String,
	},

	/// Settings file could not be read
	#[error("failed to read settings file: {0}")]
	Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
