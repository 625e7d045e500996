//! Conversions between JSON values and BSON
//!
//! Queries and hook records are JSON. ObjectIds travel as `{"$oid": hex}`
//! and datetimes as `{"$date": {"$numberLong": millis}}` so that a record
//! survives the round trip through a hook unchanged.

use bson::oid::ObjectId;
use bson::{Bson, DateTime, Document};
use odim_signals::Record;
use serde_json::{Map, Value, json};

pub fn json_to_bson(value: &Value) -> Bson {
	match value {
		Value::Null => Bson::Null,
		Value::Bool(b) => Bson::Boolean(*b),
		Value::Number(n) => match n.as_i64() {
			Some(i) => match i32::try_from(i) {
				Ok(small) => Bson::Int32(small),
				Err(_) => Bson::Int64(i),
			},
			None => Bson::Double(n.as_f64().unwrap_or(f64::NAN)),
		},
		Value::String(s) => Bson::String(s.clone()),
		Value::Array(items) => Bson::Array(items.iter().map(json_to_bson).collect()),
		Value::Object(map) => object_to_bson(map),
	}
}

fn object_to_bson(map: &Map<String, Value>) -> Bson {
	if map.len() == 1 {
		if let Some(Value::String(hex)) = map.get("$oid")
			&& let Ok(oid) = ObjectId::parse_str(hex)
		{
			return Bson::ObjectId(oid);
		}
		if let Some(date) = map.get("$date")
			&& let Some(millis) = date_millis(date)
		{
			return Bson::DateTime(DateTime::from_millis(millis));
		}
	}
	Bson::Document(map_to_document(map))
}

fn date_millis(value: &Value) -> Option<i64> {
	match value {
		Value::Number(n) => n.as_i64(),
		Value::Object(inner) => inner.get("$numberLong")?.as_str()?.parse().ok(),
		_ => None,
	}
}

fn map_to_document(map: &Map<String, Value>) -> Document {
	map.iter().map(|(k, v)| (k.clone(), json_to_bson(v))).collect()
}

pub fn bson_to_json(value: Bson) -> Value {
	match value {
		Bson::Null | Bson::Undefined => Value::Null,
		Bson::Boolean(b) => Value::Bool(b),
		Bson::Int32(i) => Value::from(i),
		Bson::Int64(i) => Value::from(i),
		Bson::Double(f) => Value::from(f),
		Bson::String(s) => Value::String(s),
		Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
		Bson::Document(doc) => Value::Object(document_to_record(doc)),
		Bson::ObjectId(oid) => json!({ "$oid": oid.to_hex() }),
		Bson::DateTime(dt) => json!({ "$date": { "$numberLong": dt.timestamp_millis().to_string() } }),
		other => Value::String(other.to_string()),
	}
}

/// A stored document as a hook record
pub fn document_to_record(doc: Document) -> Record {
	doc.into_iter().map(|(k, v)| (k, bson_to_json(v))).collect()
}

/// A hook record back into a document
pub fn record_to_document(record: &Record) -> Document {
	map_to_document(record)
}
