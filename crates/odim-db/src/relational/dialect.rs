//! Per-database SQL rendering rules

use sea_query::{MysqlQueryBuilder, PostgresQueryBuilder, QueryStatementWriter, SqliteQueryBuilder, Values};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
	MySql,
	Postgres,
	Sqlite,
}

impl SqlDialect {
	pub fn for_protocol(protocol: &str) -> Option<Self> {
		match protocol {
			"mysql" => Some(SqlDialect::MySql),
			"postgres" | "postgresql" => Some(SqlDialect::Postgres),
			"sqlite" => Some(SqlDialect::Sqlite),
			_ => None,
		}
	}

	/// Whether an INSERT can hand back the generated key
	///
	/// MySQL reports it through the last insert id instead.
	pub fn supports_returning(self) -> bool {
		matches!(self, SqlDialect::Postgres | SqlDialect::Sqlite)
	}

	/// Whether OFFSET may appear without a LIMIT
	pub fn allows_bare_offset(self) -> bool {
		matches!(self, SqlDialect::Postgres)
	}

	/// Render a statement with this dialect's quoting and placeholders
	pub fn build<S: QueryStatementWriter>(self, statement: &S) -> (String, Values) {
		match self {
			SqlDialect::MySql => statement.build(MysqlQueryBuilder),
			SqlDialect::Postgres => statement.build(PostgresQueryBuilder),
			SqlDialect::Sqlite => statement.build(SqliteQueryBuilder),
		}
	}
}

impl fmt::Display for SqlDialect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SqlDialect::MySql => f.write_str("mysql"),
			SqlDialect::Postgres => f.write_str("postgres"),
			SqlDialect::Sqlite => f.write_str("sqlite"),
		}
	}
}
