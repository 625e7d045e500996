//! Typed connection pools, one variant per dialect

use super::builder::Statement;
use super::dialect::SqlDialect;
use super::row::{RawRow, bind_values, raw_record};
use crate::error::{OdimError, Result};
use odim_conf::{ConnectionParams, PoolSettings};
use odim_signals::Record;
use sqlx::mysql::MySqlPool;
use sqlx::pool::PoolOptions;
use sqlx::postgres::PgPool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Database;
use std::str::FromStr;

/// A shared pool for one SQL connection alias
#[derive(Debug, Clone)]
pub enum SqlPool {
	MySql(MySqlPool),
	Postgres(PgPool),
	Sqlite(SqlitePool),
}

/// Run the same expression against whichever typed pool is held
macro_rules! with_pool {
	($self:expr, $pool:ident => $body:expr) => {
		match $self {
			SqlPool::MySql($pool) => $body,
			SqlPool::Postgres($pool) => $body,
			SqlPool::Sqlite($pool) => $body,
		}
	};
}

fn pool_options<DB: Database>(params: &ConnectionParams, settings: &PoolSettings) -> PoolOptions<DB> {
	let options = PoolOptions::<DB>::new().acquire_timeout(settings.acquire_timeout());
	// An in-memory SQLite database lives and dies with its connection
	if params.is_in_memory() {
		options
			.max_connections(1)
			.min_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
	} else {
		options
			.max_connections(settings.max_connections)
			.min_connections(settings.min_connections)
			.idle_timeout(settings.idle_timeout())
			.max_lifetime(settings.max_lifetime())
	}
}

impl SqlPool {
	/// Open a pool for a relational connection
	pub async fn connect(params: &ConnectionParams, settings: &PoolSettings) -> Result<Self> {
		let dialect = SqlDialect::for_protocol(&params.protocol).ok_or_else(|| {
			OdimError::Configuration(format!("`{}` is not a supported SQL protocol", params.protocol))
		})?;
		let url = params.to_url(true);
		let pool = match dialect {
			SqlDialect::MySql => SqlPool::MySql(pool_options(params, settings).connect(&url).await?),
			SqlDialect::Postgres => SqlPool::Postgres(pool_options(params, settings).connect(&url).await?),
			SqlDialect::Sqlite => {
				let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
				SqlPool::Sqlite(pool_options(params, settings).connect_with(options).await?)
			}
		};
		Ok(pool)
	}

	pub fn dialect(&self) -> SqlDialect {
		match self {
			SqlPool::MySql(_) => SqlDialect::MySql,
			SqlPool::Postgres(_) => SqlDialect::Postgres,
			SqlPool::Sqlite(_) => SqlDialect::Sqlite,
		}
	}

	pub async fn close(&self) {
		with_pool!(self, pool => pool.close().await)
	}

	/// Run unparameterized SQL, possibly several statements
	///
	/// Meant for DDL and fixtures; returns the rows affected.
	pub async fn execute_script(&self, sql: &str) -> Result<u64> {
		let affected = with_pool!(self, pool => sqlx::raw_sql(sql).execute(pool).await?.rows_affected());
		Ok(affected)
	}

	pub(crate) async fn execute(&self, statement: &Statement) -> Result<u64> {
		let values = statement.values.clone();
		let affected = with_pool!(self, pool => bind_values(&statement.sql, values).execute(pool).await?.rows_affected());
		Ok(affected)
	}

	pub(crate) async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Record>> {
		let values = statement.values.clone();
		let records = with_pool!(self, pool => records(bind_values(&statement.sql, values).fetch_all(pool).await?));
		Ok(records)
	}

	pub(crate) async fn fetch_optional(&self, statement: &Statement) -> Result<Option<Record>> {
		let values = statement.values.clone();
		let record = with_pool!(self, pool => bind_values(&statement.sql, values)
			.fetch_optional(pool)
			.await?
			.as_ref()
			.map(raw_record));
		Ok(record)
	}

	/// Run an INSERT and return the generated integer key
	///
	/// RETURNING dialects read the statement's single returned column;
	/// MySQL reports the key on the query result.
	pub(crate) async fn insert(&self, statement: &Statement) -> Result<Option<i64>> {
		let values = statement.values.clone();
		match self {
			SqlPool::MySql(pool) => {
				let result = bind_values(&statement.sql, values).execute(pool).await?;
				Ok(i64::try_from(result.last_insert_id()).ok().filter(|id| *id > 0))
			}
			SqlPool::Postgres(pool) => {
				let row = bind_values(&statement.sql, values).fetch_optional(pool).await?;
				Ok(row.as_ref().and_then(first_integer))
			}
			SqlPool::Sqlite(pool) => {
				let row = bind_values(&statement.sql, values).fetch_optional(pool).await?;
				Ok(row.as_ref().and_then(first_integer))
			}
		}
	}
}

fn records<R: RawRow>(rows: Vec<R>) -> Vec<Record> {
	rows.iter().map(raw_record).collect()
}

fn first_integer<R: RawRow>(row: &R) -> Option<i64> {
	if row.columns().is_empty() {
		return None;
	}
	row.raw_value(0).as_i64()
}
