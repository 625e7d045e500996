//! In-process document store
//!
//! Evaluates the filters the document driver renders (equality, `$ne`,
//! `$gt`/`$gte`/`$lt`/`$lte`, `$regex` with `$options`, `$exists`, `$or`,
//! `$and`, null matching missing fields) and applies `$set` updates, so the
//! driver can be exercised without a MongoDB server.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use odim_db::document::{DocumentBackend, FindOptions, UpdateResult};
use odim_db::{OdimError, Result};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering as AtomicOrdering};

#[derive(Debug)]
pub struct MemoryDocumentBackend {
	database_name: String,
	collections: Mutex<HashMap<String, Vec<Document>>>,
	failing_reads: AtomicU32,
	read_attempts: AtomicUsize,
}

impl Default for MemoryDocumentBackend {
	fn default() -> Self {
		Self::new("test")
	}
}

impl MemoryDocumentBackend {
	pub fn new(database_name: impl Into<String>) -> Self {
		Self {
			database_name: database_name.into(),
			collections: Mutex::new(HashMap::new()),
			failing_reads: AtomicU32::new(0),
			read_attempts: AtomicUsize::new(0),
		}
	}

	/// Make the next `n` multi-document reads fail with a transient error
	pub fn fail_next_reads(&self, n: u32) {
		self.failing_reads.store(n, AtomicOrdering::SeqCst);
	}

	/// Calls to `find_many` and `count_documents` so far, failed ones included
	pub fn read_attempts(&self) -> usize {
		self.read_attempts.load(AtomicOrdering::SeqCst)
	}

	/// Stored documents of `collection`, in insertion order
	pub fn documents(&self, collection: &str) -> Vec<Document> {
		self.collections.lock().get(collection).cloned().unwrap_or_default()
	}

	/// Store a document as is
	pub fn seed(&self, collection: &str, document: Document) {
		self.collections
			.lock()
			.entry(collection.to_string())
			.or_default()
			.push(document);
	}

	fn read(&self) -> Result<()> {
		self.read_attempts.fetch_add(1, AtomicOrdering::SeqCst);
		let pending = self.failing_reads.load(AtomicOrdering::SeqCst);
		if pending > 0 {
			self.failing_reads.store(pending - 1, AtomicOrdering::SeqCst);
			tracing::debug!(database = %self.database_name, remaining = pending - 1, "injected read failure");
			return Err(OdimError::Transient("simulated connection reset".to_string()));
		}
		Ok(())
	}
}

#[async_trait]
impl DocumentBackend for MemoryDocumentBackend {
	fn database_name(&self) -> &str {
		&self.database_name
	}

	async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
		let collections = self.collections.lock();
		Ok(collections
			.get(collection)
			.and_then(|docs| docs.iter().find(|doc| matches(doc, &filter)))
			.cloned())
	}

	async fn find_many(&self, collection: &str, filter: Document, options: FindOptions) -> Result<Vec<Document>> {
		self.read()?;
		let mut found: Vec<Document> = self
			.documents(collection)
			.into_iter()
			.filter(|doc| matches(doc, &filter))
			.collect();
		if let Some(sort) = &options.sort {
			found.sort_by(|a, b| compare_by(a, b, sort));
		}
		let skip = options.skip.unwrap_or(0) as usize;
		let limit = options
			.limit
			.filter(|limit| *limit > 0)
			.map_or(usize::MAX, |limit| limit as usize);
		Ok(found.into_iter().skip(skip).take(limit).collect())
	}

	async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Bson> {
		let id = match document.get("_id") {
			Some(id) => id.clone(),
			None => {
				let id = Bson::ObjectId(ObjectId::new());
				document.insert("_id", id.clone());
				id
			}
		};
		let mut collections = self.collections.lock();
		let docs = collections.entry(collection.to_string()).or_default();
		if docs.iter().any(|doc| doc.get("_id") == Some(&id)) {
			return Err(OdimError::Backend(format!("duplicate key _id: {}", id)));
		}
		docs.push(document);
		Ok(id)
	}

	async fn replace_one(&self, collection: &str, filter: Document, replacement: Document) -> Result<UpdateResult> {
		let mut collections = self.collections.lock();
		let Some(doc) = collections
			.get_mut(collection)
			.and_then(|docs| docs.iter_mut().find(|doc| matches(doc, &filter)))
		else {
			return Ok(UpdateResult::new(0, 0));
		};
		let mut next = replacement;
		if let Some(id) = doc.get("_id") {
			next.insert("_id", id.clone());
		}
		let modified = u64::from(*doc != next);
		*doc = next;
		Ok(UpdateResult::new(1, modified))
	}

	async fn update_one(&self, collection: &str, filter: Document, update: Document) -> Result<UpdateResult> {
		let changes = match update.get("$set") {
			Some(Bson::Document(changes)) => changes.clone(),
			_ => return Err(OdimError::Backend(format!("unsupported update document {}", update))),
		};
		let mut collections = self.collections.lock();
		let Some(doc) = collections
			.get_mut(collection)
			.and_then(|docs| docs.iter_mut().find(|doc| matches(doc, &filter)))
		else {
			return Ok(UpdateResult::new(0, 0));
		};
		let before = doc.clone();
		for (field, value) in changes {
			doc.insert(field, value);
		}
		Ok(UpdateResult::new(1, u64::from(before != *doc)))
	}

	async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
		let mut collections = self.collections.lock();
		let Some(docs) = collections.get_mut(collection) else {
			return Ok(0);
		};
		match docs.iter().position(|doc| matches(doc, &filter)) {
			Some(index) => {
				docs.remove(index);
				Ok(1)
			}
			None => Ok(0),
		}
	}

	async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
		self.read()?;
		let count = self
			.documents(collection)
			.iter()
			.filter(|doc| matches(doc, &filter))
			.count();
		Ok(count as u64)
	}
}

/// Whether `doc` satisfies every clause of `filter`
pub fn matches(doc: &Document, filter: &Document) -> bool {
	filter.iter().all(|(key, condition)| match key.as_str() {
		"$or" => clauses(condition).iter().any(|clause| matches(doc, clause)),
		"$and" => clauses(condition).iter().all(|clause| matches(doc, clause)),
		field => field_matches(doc.get(field), condition),
	})
}

fn clauses(condition: &Bson) -> Vec<Document> {
	match condition {
		Bson::Array(items) => items
			.iter()
			.filter_map(|item| match item {
				Bson::Document(doc) => Some(doc.clone()),
				_ => None,
			})
			.collect(),
		_ => Vec::new(),
	}
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
	match condition {
		Bson::Document(doc) if !doc.is_empty() && doc.keys().all(|key| key.starts_with('$')) => Some(doc),
		_ => None,
	}
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> bool {
	let Some(operators) = is_operator_document(condition) else {
		return equals(value, condition);
	};
	operators.iter().all(|(operator, operand)| match operator.as_str() {
		"$ne" => !equals(value, operand),
		"$gt" => compare(value, operand).is_some_and(Ordering::is_gt),
		"$gte" => compare(value, operand).is_some_and(Ordering::is_ge),
		"$lt" => compare(value, operand).is_some_and(Ordering::is_lt),
		"$lte" => compare(value, operand).is_some_and(Ordering::is_le),
		"$exists" => matches!(operand, Bson::Boolean(expected) if value.is_some() == *expected),
		"$regex" => regex_matches(value, operand, operators.get("$options")),
		"$options" => true,
		_ => false,
	})
}

/// Equality with MongoDB's null rule: `null` also matches a missing field
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
	match (value, expected) {
		(None | Some(Bson::Null), Bson::Null) => true,
		(None, _) => false,
		(Some(value), expected) => match (as_f64(value), as_f64(expected)) {
			(Some(a), Some(b)) => a == b,
			_ => value == expected,
		},
	}
}

fn as_f64(value: &Bson) -> Option<f64> {
	match value {
		Bson::Int32(i) => Some(f64::from(*i)),
		Bson::Int64(i) => Some(*i as f64),
		Bson::Double(f) => Some(*f),
		_ => None,
	}
}

fn compare(value: Option<&Bson>, operand: &Bson) -> Option<Ordering> {
	let value = value?;
	if let (Some(a), Some(b)) = (as_f64(value), as_f64(operand)) {
		return a.partial_cmp(&b);
	}
	match (value, operand) {
		(Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
		(Bson::DateTime(a), Bson::DateTime(b)) => Some(a.timestamp_millis().cmp(&b.timestamp_millis())),
		(Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
		(Bson::ObjectId(a), Bson::ObjectId(b)) => Some(a.bytes().cmp(&b.bytes())),
		_ => None,
	}
}

fn regex_matches(value: Option<&Bson>, pattern: &Bson, options: Option<&Bson>) -> bool {
	let (Some(Bson::String(text)), Bson::String(pattern)) = (value, pattern) else {
		return false;
	};
	let insensitive = matches!(options, Some(Bson::String(opts)) if opts.contains('i'));
	let pattern = if insensitive {
		format!("(?i){}", pattern)
	} else {
		pattern.clone()
	};
	regex::Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
}

/// Order two documents by a MongoDB sort specification
fn compare_by(a: &Document, b: &Document, sort: &Document) -> Ordering {
	for (field, direction) in sort {
		let descending = as_f64(direction).is_some_and(|d| d < 0.0);
		let ordering = match (a.get(field), b.get(field)) {
			(None, None) => Ordering::Equal,
			(None, Some(_)) => Ordering::Less,
			(Some(_), None) => Ordering::Greater,
			(Some(x), Some(y)) => compare(Some(x), y).unwrap_or(Ordering::Equal),
		};
		let ordering = if descending { ordering.reverse() } else { ordering };
		if ordering != Ordering::Equal {
			return ordering;
		}
	}
	Ordering::Equal
}
