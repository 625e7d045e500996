//! Pagination, sorting and the search envelope

use crate::error::{OdimError, Result};
use crate::query::{Query, is_identifier};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static SORT_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[,a-zA-Z0-9_-]*$").expect("Invalid sort regex pattern"));

/// Offset, limit and sort for a find
///
/// `sort` is a comma-separated list of field names, each optionally
/// prefixed with `-` for descending order. A limit of `0` means no limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
	pub offset: u64,
	pub limit: u64,
	pub sort: Option<String>,
}

impl Default for SearchParams {
	fn default() -> Self {
		Self {
			offset: 0,
			limit: 25,
			sort: None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
	Ascending,
	Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
	pub field: String,
	pub direction: SortDirection,
}

impl SearchParams {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_offset(mut self, offset: u64) -> Self {
		self.offset = offset;
		self
	}

	pub fn with_limit(mut self, limit: u64) -> Self {
		self.limit = limit;
		self
	}

	pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
		self.sort = Some(sort.into());
		self
	}

	/// Parse the sort expression
	///
	/// ```
	/// use odim_db::search::{SearchParams, SortDirection};
	///
	/// let fields = SearchParams::new().with_sort("-created,name").sort_fields().unwrap();
	/// assert_eq!(fields[0].field, "created");
	/// assert_eq!(fields[0].direction, SortDirection::Descending);
	/// assert_eq!(fields[1].direction, SortDirection::Ascending);
	/// ```
	pub fn sort_fields(&self) -> Result<Vec<SortField>> {
		let Some(sort) = self.sort.as_deref() else {
			return Ok(Vec::new());
		};
		if !SORT_PATTERN.is_match(sort) {
			return Err(OdimError::Validation(format!("invalid sort expression `{}`", sort)));
		}
		sort.split(',')
			.filter(|part| !part.is_empty())
			.map(|part| {
				let (field, direction) = match part.strip_prefix('-') {
					Some(field) => (field, SortDirection::Descending),
					None => (part, SortDirection::Ascending),
				};
				if !is_identifier(field) {
					return Err(OdimError::Validation(format!("invalid sort field `{}`", part)));
				}
				Ok(SortField {
					field: field.to_string(),
					direction,
				})
			})
			.collect()
	}
}

/// Parse the free-form `q` parameter of a search request
///
/// `q` is either a JSON object or a single `key=value` pair. Keys must be
/// plain identifiers, optionally carrying an operation suffix.
///
/// ```
/// use odim_db::search::parse_q;
///
/// let query = parse_q(Some(r#"{"age__gte": 18}"#)).unwrap();
/// assert_eq!(query.get("age__gte"), Some(&serde_json::json!(18)));
///
/// let query = parse_q(Some("status=active")).unwrap();
/// assert_eq!(query.get("status"), Some(&serde_json::json!("active")));
///
/// assert!(parse_q(Some("drop table")).is_err());
/// ```
pub fn parse_q(q: Option<&str>) -> Result<Query> {
	let Some(q) = q.map(str::trim).filter(|q| !q.is_empty()) else {
		return Ok(Query::new());
	};

	let query = if q.starts_with('{') {
		let value: Value = serde_json::from_str(q)
			.map_err(|e| OdimError::Validation(format!("`q` is not valid JSON: {}", e)))?;
		Query::from_value(value)?
	} else if let Some((key, value)) = q.split_once('=') {
		Query::new().filter(key.trim(), value.trim())
	} else {
		return Err(OdimError::Validation(format!(
			"`q` must be a JSON object or a key=value pair, got `{}`",
			q
		)));
	};

	if let Some((key, _)) = query.iter().find(|(key, _)| !is_identifier(key)) {
		return Err(OdimError::Validation(format!("invalid query key `{}`", key)));
	}
	Ok(query)
}

/// Result of a paginated search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse<M> {
	/// The request that produced this page
	pub search: Value,
	/// Count of all matches, ignoring offset and limit
	pub total: u64,
	pub results: Vec<M>,
}

/// Acknowledgement body for writes that return nothing else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
	pub ok: bool,
}

impl Default for OkResponse {
	fn default() -> Self {
		Self { ok: true }
	}
}
