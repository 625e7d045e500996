//! Backend-neutral filter algebra
//!
//! A query is a flat map from keys to values. A key is a field name,
//! optionally suffixed with an operation:
//!
//! | suffix       | operation             |
//! |--------------|-----------------------|
//! | `__is`       | equal (the default)   |
//! | `__not`      | not equal             |
//! | `__contains` | case-insensitive substring |
//! | `__gt`, `__gte`, `__lt`, `__lte` | ordering |
//! | `__null`     | missing or null when the value is truthy, present otherwise |
//!
//! Drivers render the normalized form into their native filter language.

use crate::error::{OdimError, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static IDENTIFIER: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Invalid identifier regex pattern"));

/// Whether `name` is safe to use as a field, column or sort key
pub fn is_identifier(name: &str) -> bool {
	IDENTIFIER.is_match(name)
}

/// Filter operation carried by a query key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	Exact,
	NotEqual,
	Contains,
	Gt,
	Gte,
	Lt,
	Lte,
	IsNull,
}

impl Operation {
	/// Every operation in the order suffixes are tried
	pub const ALL: [Operation; 8] = [
		Operation::Exact,
		Operation::NotEqual,
		Operation::Contains,
		Operation::Gt,
		Operation::Gte,
		Operation::Lt,
		Operation::Lte,
		Operation::IsNull,
	];

	pub fn suffix(self) -> &'static str {
		match self {
			Operation::Exact => "__is",
			Operation::NotEqual => "__not",
			Operation::Contains => "__contains",
			Operation::Gt => "__gt",
			Operation::Gte => "__gte",
			Operation::Lt => "__lt",
			Operation::Lte => "__lte",
			Operation::IsNull => "__null",
		}
	}
}

/// Split a query key into its base field and operation
///
/// The first suffix that matches wins. Keys without a known suffix are
/// equality tests on the whole key.
///
/// ```
/// use odim_db::query::{Operation, parse_field};
///
/// assert_eq!(parse_field("age__gte"), ("age", Operation::Gte));
/// assert_eq!(parse_field("name"), ("name", Operation::Exact));
/// assert_eq!(parse_field("name__not"), ("name", Operation::NotEqual));
/// ```
pub fn parse_field(key: &str) -> (&str, Operation) {
	for op in Operation::ALL {
		if let Some(base) = key.strip_suffix(op.suffix())
			&& !base.is_empty()
		{
			return (base, op);
		}
	}
	(key, Operation::Exact)
}

/// Truthiness of a `__null` argument
///
/// Query strings arrive as text, so `"true"`, `"1"` and `"yes"` count.
pub fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
		Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
		Value::Null => false,
		Value::Array(a) => !a.is_empty(),
		Value::Object(o) => !o.is_empty(),
	}
}

/// A filter: ordered keys with optional operation suffixes
///
/// # Examples
///
/// ```
/// use odim_db::Query;
///
/// let query = Query::new()
/// 	.filter("status", "active")
/// 	.filter("age__gte", 18)
/// 	.filter("email__null", false);
///
/// assert_eq!(query.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(IndexMap<String, Value>);

impl Query {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(key, value);
		self
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.0.insert(key.into(), value.into());
	}

	/// Add every entry of `other`, overwriting keys already present
	pub fn extend(&mut self, other: &Query) {
		for (key, value) in &other.0 {
			self.0.insert(key.clone(), value.clone());
		}
	}

	/// Build a query from a JSON object
	pub fn from_value(value: Value) -> Result<Self> {
		match value {
			Value::Object(map) => Ok(Self(map.into_iter().collect())),
			other => Err(OdimError::Validation(format!(
				"a query must be a JSON object, got {}",
				other
			))),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Resolve suffixes into one predicate per base field
	pub fn normalize(&self) -> NormalizedQuery {
		let mut predicates = IndexMap::with_capacity(self.0.len());
		for (key, value) in &self.0 {
			let (field, op) = parse_field(key);
			if let Some((previous, _)) = predicates.insert(field.to_string(), (op, value.clone())) {
				tracing::warn!(
					field,
					replaced = ?previous,
					by = ?op,
					"query names the same field twice; keeping the last"
				);
			}
		}
		NormalizedQuery { predicates }
	}
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Query {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

/// A query after suffix resolution: base field to `(operation, value)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedQuery {
	predicates: IndexMap<String, (Operation, Value)>,
}

impl NormalizedQuery {
	pub fn iter(&self) -> impl Iterator<Item = (&str, Operation, &Value)> {
		self.predicates
			.iter()
			.map(|(field, (op, value))| (field.as_str(), *op, value))
	}

	pub fn get(&self, field: &str) -> Option<(Operation, &Value)> {
		self.predicates.get(field).map(|(op, value)| (*op, value))
	}

	/// Fields tested for equality, used to stamp new records
	pub fn exact_values(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.iter()
			.filter(|(_, op, _)| *op == Operation::Exact)
			.map(|(field, _, value)| (field, value))
	}

	pub fn is_empty(&self) -> bool {
		self.predicates.is_empty()
	}

	pub fn len(&self) -> usize {
		self.predicates.len()
	}
}
