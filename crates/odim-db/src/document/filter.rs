//! Rendering normalized queries as MongoDB filters

use super::backend::FindOptions;
use super::convert::json_to_bson;
use crate::error::Result;
use crate::query::{NormalizedQuery, Operation, is_truthy};
use crate::search::{SearchParams, SortDirection, SortField};
use bson::{Bson, Document, doc};
use serde_json::Value;

/// Build a MongoDB filter document
///
/// Each `__null` test is an `$or`/`$and` clause. A single clause is merged
/// into the filter; several are combined under one `$and` so they do not
/// overwrite each other.
pub fn render_filter(query: &NormalizedQuery) -> Document {
	let mut filter = Document::new();
	let mut null_clauses = Vec::new();

	for (field, op, value) in query.iter() {
		match op {
			Operation::Exact => {
				filter.insert(field, json_to_bson(value));
			}
			Operation::NotEqual => {
				filter.insert(field, doc! { "$ne": json_to_bson(value) });
			}
			Operation::Contains => {
				let pattern = format!(".*{}.*", regex::escape(&as_text(value)));
				filter.insert(field, doc! { "$regex": pattern, "$options": "i" });
			}
			Operation::Gt => {
				filter.insert(field, doc! { "$gt": json_to_bson(value) });
			}
			Operation::Gte => {
				filter.insert(field, doc! { "$gte": json_to_bson(value) });
			}
			Operation::Lt => {
				filter.insert(field, doc! { "$lt": json_to_bson(value) });
			}
			Operation::Lte => {
				filter.insert(field, doc! { "$lte": json_to_bson(value) });
			}
			Operation::IsNull => null_clauses.push(null_clause(field, is_truthy(value))),
		}
	}

	match null_clauses.len() {
		0 => {}
		1 => {
			for (key, clause) in null_clauses.remove(0) {
				filter.insert(key, clause);
			}
		}
		_ => {
			filter.insert("$and", null_clauses.into_iter().map(Bson::Document).collect::<Vec<_>>());
		}
	}
	filter
}

fn null_clause(field: &str, wants_null: bool) -> Document {
	let mut exists = Document::new();
	let mut null_match = Document::new();
	if wants_null {
		exists.insert(field, doc! { "$exists": false });
		null_match.insert(field, Bson::Null);
		doc! { "$or": [exists, null_match] }
	} else {
		exists.insert(field, doc! { "$exists": true });
		null_match.insert(field, doc! { "$ne": Bson::Null });
		doc! { "$and": [exists, null_match] }
	}
}

fn as_text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// Build a MongoDB sort document, or `None` when nothing is sorted
pub fn render_sort(fields: &[SortField]) -> Option<Document> {
	if fields.is_empty() {
		return None;
	}
	Some(
		fields
			.iter()
			.map(|f| {
				let direction = match f.direction {
					SortDirection::Ascending => 1,
					SortDirection::Descending => -1,
				};
				(f.field.clone(), Bson::Int32(direction))
			})
			.collect(),
	)
}

/// Skip, limit and sort for one page of results
///
/// A zero limit, or one too large for MongoDB's signed limit, means unbounded.
pub fn render_page(params: &SearchParams) -> Result<FindOptions> {
	Ok(FindOptions {
		skip: Some(params.offset).filter(|offset| *offset > 0),
		limit: i64::try_from(params.limit).ok().filter(|limit| *limit > 0),
		sort: render_sort(&params.sort_fields()?),
	})
}
