//! Document driver CRUD against the in-memory store

use bson::{Bson, doc};
use odim::db::{OdimError, Query, RecordId, Schema, SearchParams};
use odim_integration_tests::{names, seed_people};
use odim_test::MemoryDocumentBackend;
use odim_test::fixtures::{Person, document_odim, memory_backend};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;

#[rstest]
#[tokio::test]
async fn test_save_inserts_with_generated_id(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(Arc::clone(&memory_backend)).await;
	let people = odim.objects::<Person>().unwrap();
	let mut ann = Person::new("Ann", 31);

	// Act
	let id = people.bind(&mut ann).save().await.unwrap();

	// Assert
	assert!(matches!(id, RecordId::ObjectId(_)));
	assert_eq!(ann.id().unwrap(), id);
	let stored = memory_backend.documents("people");
	assert_eq!(stored.len(), 1);
	assert_eq!(stored[0].get("deleted"), Some(&Bson::Boolean(false)));
	assert_eq!(stored[0].get("_id"), Some(&Bson::ObjectId(ann.id.unwrap())));
}

#[rstest]
#[tokio::test]
async fn test_save_stamps_extend_fields_on_insert(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(Arc::clone(&memory_backend)).await;
	let people = odim.objects::<Person>().unwrap();
	let mut ann = Person::new("Ann", 31);
	let tenant = Query::new().filter("tenant", "acme");

	people.bind(&mut ann).save_with(&tenant, false).await.unwrap();

	assert_eq!(memory_backend.documents("people")[0].get_str("tenant").ok(), Some("acme"));
	assert!(people.get_with(ann.id().unwrap(), &tenant, false).await.is_ok());
	let other = Query::new().filter("tenant", "globex");
	assert!(people.get_with(ann.id().unwrap(), &other, false).await.unwrap_err().is_not_found());
}

#[rstest]
#[tokio::test]
async fn test_get_round_trip_and_not_found(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(memory_backend).await;
	let saved = seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();

	// Act
	let found = people.get(saved[0].id().unwrap()).await.unwrap();
	let by_hex = people.get(saved[0].id.unwrap().to_hex()).await.unwrap();
	let missing = people.get(bson::oid::ObjectId::new()).await;

	// Assert
	assert_eq!(found, saved[0]);
	assert_eq!(by_hex, saved[0]);
	assert!(matches!(missing, Err(OdimError::NotFound { .. })));
}

#[rstest]
#[tokio::test]
async fn test_save_existing_replaces_the_record(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(Arc::clone(&memory_backend)).await;
	let mut saved = seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();

	let mut bob = saved.remove(1);
	bob.age = 18;
	bob.email = Some("bob@example.com".to_string());
	let id = people.bind(&mut bob).save().await.unwrap();

	assert_eq!(id, bob.id().unwrap());
	assert_eq!(people.get(id).await.unwrap(), bob);
	assert_eq!(memory_backend.documents("people").len(), 3);
}

#[rstest]
#[tokio::test]
async fn test_save_existing_that_matches_nothing_fails(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	let people = odim.objects::<Person>().unwrap();
	let mut ghost = Person::new("Ghost", 99);
	ghost.id = Some(bson::oid::ObjectId::new());

	let result = people.bind(&mut ghost).save().await;

	assert!(matches!(result, Err(OdimError::NotModified { .. })));
	assert_eq!(people.count(&Query::new()).await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn test_update_writes_only_set_fields(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(Arc::clone(&memory_backend)).await;
	let saved = seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();
	let mut patch = saved[0].clone();
	patch.name = "Annie".to_string();
	patch.age = 40;
	patch.email = None;

	// Act
	let result = people
		.bind(&mut patch)
		.update_with(&Query::new(), false, Some(&["name".to_string()]))
		.await
		.unwrap();

	// Assert
	assert_eq!(result.matched, 1);
	let stored = people.get(saved[0].id().unwrap()).await.unwrap();
	assert_eq!(stored.name, "Annie");
	assert_eq!(stored.age, 31);
	assert_eq!(stored.email.as_deref(), Some("ann@example.com"));
}

#[rstest]
#[tokio::test]
async fn test_update_skips_null_fields(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	let saved = seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();
	let mut patch = saved[2].clone();
	patch.age = 46;
	patch.email = None;

	people.bind(&mut patch).update().await.unwrap();

	let stored = people.get(saved[2].id().unwrap()).await.unwrap();
	assert_eq!(stored.age, 46);
	assert_eq!(stored.email.as_deref(), Some("cy@example.org"));
}

#[rstest]
#[tokio::test]
async fn test_update_requires_an_identifier(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	let people = odim.objects::<Person>().unwrap();
	let mut unsaved = Person::new("Dee", 20);

	let result = people.bind(&mut unsaved).update().await;

	assert!(matches!(result, Err(OdimError::Validation(_))));
}

#[rstest]
#[case(Query::new().filter("age__gte", 31), vec!["Ann", "Cy"])]
#[case(Query::new().filter("age__lt", 31), vec!["bob"])]
#[case(Query::new().filter("name__not", "Ann"), vec!["bob", "Cy"])]
#[case(Query::new().filter("name__contains", "B"), vec!["bob"])]
#[case(Query::new().filter("email__null", true), vec!["bob"])]
#[case(Query::new().filter("email__null", false), vec!["Ann", "Cy"])]
#[case(Query::new().filter("email__contains", "example.com").filter("age__gt", 40), vec![])]
#[tokio::test]
async fn test_find_operations(#[case] query: Query, #[case] expected: Vec<&str>) {
	let odim = document_odim(Arc::new(MemoryDocumentBackend::default())).await;
	seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();

	let found = people.find(&query).await.unwrap();

	assert_eq!(names(&found), expected);
}

#[rstest]
#[tokio::test]
async fn test_find_with_sort_and_pagination(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();
	let params = SearchParams::new().with_sort("-age").with_offset(1).with_limit(1);

	let found = people.find_with(&Query::new(), &params, false).await.unwrap();

	assert_eq!(names(&found), vec!["Ann"]);
}

#[rstest]
#[tokio::test]
async fn test_invalid_sort_is_rejected(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	let people = odim.objects::<Person>().unwrap();
	let params = SearchParams::new().with_sort("age; drop");

	let result = people.find_with(&Query::new(), &params, false).await;

	assert!(matches!(result, Err(OdimError::Validation(_))));
}

#[rstest]
#[case::missing_email(true, 1)]
#[case::present_email(false, 2)]
#[tokio::test]
async fn test_count_null_checks(#[case] wants_null: bool, #[case] expected: u64) {
	// Arrange
	let odim = document_odim(Arc::new(MemoryDocumentBackend::default())).await;
	seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();

	// Act
	let count = people.count(&Query::new().filter("email__null", wants_null)).await.unwrap();

	// Assert
	assert_eq!(count, expected);
}

#[rstest]
#[tokio::test]
async fn test_search_returns_total_and_page(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(memory_backend).await;
	seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();
	let query = Query::new().filter("age__gt", 20);
	let params = SearchParams::new().with_sort("name").with_limit(1);

	// Act
	let response = people.search(&query, &params).await.unwrap();

	// Assert
	assert_eq!(response.total, 2);
	assert_eq!(names(&response.results), vec!["Ann"]);
	assert_eq!(response.search["limit"], json!(1));
	assert_eq!(response.search["q"], json!({"age__gt": 20}));
}

#[rstest]
#[tokio::test]
async fn test_soft_delete_hides_records(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(Arc::clone(&memory_backend)).await;
	let saved = seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();
	let bob_id = saved[1].id().unwrap();

	// Act
	let result = people.delete(bob_id.clone()).await.unwrap();

	// Assert
	assert_eq!(result.affected, 1);
	assert_eq!(memory_backend.documents("people").len(), 3);
	assert!(people.get(bob_id.clone()).await.unwrap_err().is_not_found());
	assert_eq!(people.count(&Query::new()).await.unwrap(), 2);
	assert_eq!(people.count_with(&Query::new(), true).await.unwrap(), 3);
	assert_eq!(people.get_with(bob_id, &Query::new(), true).await.unwrap().name, "bob");
	let deleted = people
		.find_with(&Query::new().filter("deleted", true), &SearchParams::new(), true)
		.await
		.unwrap();
	assert_eq!(names(&deleted), vec!["bob"]);
}

#[rstest]
#[tokio::test]
async fn test_soft_deleted_record_cannot_be_saved(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	let mut saved = seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();
	people.delete(&saved[0]).await.unwrap();

	let result = people.bind(&mut saved[0]).save().await;

	assert!(matches!(result, Err(OdimError::NotModified { .. })));
}

#[rstest]
#[tokio::test]
async fn test_forced_hard_delete_removes_the_document(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(Arc::clone(&memory_backend)).await;
	let mut saved = seed_people(&odim).await.unwrap();
	let people = odim.objects::<Person>().unwrap();

	let result = people.bind(&mut saved[2]).delete(true).await.unwrap();

	assert_eq!(result.affected, 1);
	assert_eq!(memory_backend.documents("people").len(), 2);
	assert_eq!(people.count_with(&Query::new(), true).await.unwrap(), 2);
}

#[rstest]
#[tokio::test]
async fn test_delete_of_missing_record_without_hooks_reports_zero(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	let people = odim.objects::<Person>().unwrap();

	let result = people
		.delete_with(RecordId::from(bson::oid::ObjectId::new()), &Query::new(), true)
		.await
		.unwrap();

	assert_eq!(result.affected, 0);
}

#[rstest]
#[tokio::test]
async fn test_describe(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	let people = odim.objects::<Person>().unwrap();
	let mut ann = Person::new("Ann", 31);

	let before = people.describe(&ann);
	people.bind(&mut ann).save().await.unwrap();
	let after = people.describe(&ann);

	assert_eq!(before, "Person<???>");
	assert_eq!(after, format!("Person<{}>", ann.id.unwrap().to_hex()));
}

#[rstest]
#[tokio::test]
async fn test_documents_written_elsewhere_are_readable(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(Arc::clone(&memory_backend)).await;
	let id = bson::oid::ObjectId::new();
	memory_backend.seed("people", doc! { "_id": id, "name": "Eve", "age": 28_i64, "deleted": false });
	let people = odim.objects::<Person>().unwrap();

	let eve = people.get(id).await.unwrap();

	assert_eq!(eve.name, "Eve");
	assert_eq!(eve.email, None);
}
