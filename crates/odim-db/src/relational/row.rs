//! Moving values between sea-query parameters, typed sqlx rows and records

use crate::error::{OdimError, Result};
use crate::schema::FieldType;
use odim_signals::Record;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_query::Values;
use serde_json::{Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::query::Query as SqlxQuery;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Database, Encode, Row, Type, TypeInfo};

/// Bind rendered parameters to a typed query
///
/// Integers widen to `i64` and floats to `f64`. Unsigned values above
/// `i64::MAX` saturate, which only happens for an unbounded LIMIT.
pub(crate) fn bind_values<'q, DB>(sql: &'q str, values: Values) -> SqlxQuery<'q, DB, <DB as Database>::Arguments<'q>>
where
	DB: Database,
	Option<bool>: Encode<'q, DB> + Type<DB>,
	Option<i64>: Encode<'q, DB> + Type<DB>,
	Option<f64>: Encode<'q, DB> + Type<DB>,
	Option<String>: Encode<'q, DB> + Type<DB>,
	Option<Vec<u8>>: Encode<'q, DB> + Type<DB>,
{
	values.0.into_iter().fold(sqlx::query::<DB>(sql), |query, value| match value {
		sea_query::Value::Bool(v) => query.bind(v),
		sea_query::Value::TinyInt(v) => query.bind(v.map(i64::from)),
		sea_query::Value::SmallInt(v) => query.bind(v.map(i64::from)),
		sea_query::Value::Int(v) => query.bind(v.map(i64::from)),
		sea_query::Value::BigInt(v) => query.bind(v),
		sea_query::Value::TinyUnsigned(v) => query.bind(v.map(i64::from)),
		sea_query::Value::SmallUnsigned(v) => query.bind(v.map(i64::from)),
		sea_query::Value::Unsigned(v) => query.bind(v.map(i64::from)),
		sea_query::Value::BigUnsigned(v) => query.bind(v.map(|n| i64::try_from(n).unwrap_or(i64::MAX))),
		sea_query::Value::Float(v) => query.bind(v.map(f64::from)),
		sea_query::Value::Double(v) => query.bind(v),
		sea_query::Value::String(v) => query.bind(v.map(|s| s.to_string())),
		sea_query::Value::Char(v) => query.bind(v.map(String::from)),
		sea_query::Value::Bytes(v) => query.bind(v.map(|b| b.to_vec())),
		sea_query::Value::Json(v) => query.bind(v.map(|j| j.to_string())),
		other => {
			tracing::warn!(value = ?other, "unsupported parameter type, binding NULL");
			query.bind(None::<String>)
		}
	})
}

/// Storage class of a column, from the type name the database reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
	Bool,
	Integer,
	Float,
	Decimal,
	Json,
	Bytes,
	Text,
}

fn column_kind(type_name: &str) -> ColumnKind {
	let name = type_name.to_ascii_uppercase();
	match name.as_str() {
		"BOOL" | "BOOLEAN" => ColumnKind::Bool,
		"NUMERIC" | "DECIMAL" => ColumnKind::Decimal,
		"REAL" | "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" => ColumnKind::Float,
		"JSON" | "JSONB" => ColumnKind::Json,
		"BLOB" | "BYTEA" | "BINARY" | "VARBINARY" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => ColumnKind::Bytes,
		other if other.contains("INT") => ColumnKind::Integer,
		_ => ColumnKind::Text,
	}
}

fn float_value(f: f64) -> Value {
	Number::from_f64(f).map_or(Value::Null, Value::Number)
}

/// A typed row whose columns can be read without a schema
pub(crate) trait RawRow: Row {
	/// Read column `index`, picking the decoder from its reported type
	fn raw_value(&self, index: usize) -> Value;
}

/// Implements [`RawRow`] for one driver's row type
///
/// The reported type picks the first decoder tried. The rest follow in a
/// fixed order so a value stored outside its declared type (SQLite allows
/// this) still decodes.
macro_rules! impl_raw_row {
	($row:ty, ints: [$($int:ty),+], floats: [$($float:ty),+], decimal: [$($decimal:ty)?]) => {
		impl RawRow for $row {
			fn raw_value(&self, index: usize) -> Value {
				let kind = self
					.columns()
					.get(index)
					.map_or(ColumnKind::Text, |column| column_kind(column.type_info().name()));
				match kind {
					ColumnKind::Bool => {
						if let Ok(value) = self.try_get::<Option<bool>, _>(index) {
							return value.map_or(Value::Null, Value::Bool);
						}
					}
					ColumnKind::Json => {
						if let Ok(value) = self.try_get::<Option<Value>, _>(index) {
							return value.unwrap_or(Value::Null);
						}
					}
					$(
						ColumnKind::Decimal => {
							if let Ok(value) = self.try_get::<Option<$decimal>, _>(index) {
								return value.and_then(|d| d.to_f64()).map_or(Value::Null, float_value);
							}
						}
					)?
					_ => {}
				}
				$(
					if let Ok(value) = self.try_get::<Option<$int>, _>(index) {
						return value.map_or(Value::Null, Value::from);
					}
				)+
				$(
					if let Ok(value) = self.try_get::<Option<$float>, _>(index) {
						return value.map_or(Value::Null, |f| float_value(f64::from(f)));
					}
				)+
				if let Ok(value) = self.try_get::<Option<String>, _>(index) {
					return value.map_or(Value::Null, Value::String);
				}
				if let Ok(value) = self.try_get::<Option<Vec<u8>>, _>(index) {
					return value.map_or(Value::Null, |bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
				}
				tracing::debug!(column = index, type_kind = ?kind, "undecodable column read as NULL");
				Value::Null
			}
		}
	};
}

impl_raw_row!(SqliteRow, ints: [i64], floats: [f64], decimal: []);
impl_raw_row!(MySqlRow, ints: [i64, u64], floats: [f64, f32], decimal: [Decimal]);
impl_raw_row!(PgRow, ints: [i64, i32, i16], floats: [f64, f32], decimal: [Decimal]);

/// Read every column of a row into a record
pub(crate) fn raw_record<R: RawRow>(row: &R) -> Record {
	row.columns()
		.iter()
		.enumerate()
		.map(|(index, column)| (column.name().to_string(), row.raw_value(index)))
		.collect()
}

/// Coerce a raw column value to the field's declared type
pub(crate) fn coerce(value: Value, ty: FieldType) -> Result<Value> {
	if value.is_null() {
		return Ok(value);
	}
	let coerced = match (ty, value) {
		(FieldType::Any, value) => value,
		(FieldType::Bool, Value::Number(n)) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
		(FieldType::Bool, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
			"1" | "true" | "t" | "yes" => Value::Bool(true),
			"0" | "false" | "f" | "no" => Value::Bool(false),
			_ => return Err(OdimError::Serialization(format!("`{}` is not a boolean", s))),
		},
		(FieldType::Integer, Value::String(s)) => s
			.trim()
			.parse::<i64>()
			.map(Value::from)
			.map_err(|e| OdimError::Serialization(format!("`{}` is not an integer: {}", s, e)))?,
		(FieldType::Integer, Value::Bool(b)) => Value::from(i64::from(b)),
		(FieldType::Float, Value::String(s)) => s
			.trim()
			.parse::<f64>()
			.ok()
			.and_then(Number::from_f64)
			.map(Value::Number)
			.ok_or_else(|| OdimError::Serialization(format!("`{}` is not a number", s)))?,
		(FieldType::Float, Value::Number(n)) => n
			.as_f64()
			.and_then(Number::from_f64)
			.map_or(Value::Number(n), Value::Number),
		(FieldType::String, Value::Number(n)) => Value::String(n.to_string()),
		(FieldType::String, Value::Bool(b)) => Value::String(b.to_string()),
		(FieldType::Json, Value::String(s)) => serde_json::from_str(&s)?,
		(_, value) => value,
	};
	Ok(coerced)
}

/// Coerce every column of a raw record with `field_type`
pub(crate) fn coerce_record(record: Record, field_type: impl Fn(&str) -> FieldType) -> Result<Record> {
	record
		.into_iter()
		.map(|(name, value)| {
			let ty = field_type(&name);
			Ok((name, coerce(value, ty)?))
		})
		.collect()
}
