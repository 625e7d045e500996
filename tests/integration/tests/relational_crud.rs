//! Relational driver against in-memory SQLite

use odim::db::{OdimError, Query, RecordId, SearchParams, WriteResult};
use odim_integration_tests::{seed_tickets, ticket_titles};
use odim_test::fixtures::{Ticket, sqlite_odim};
use rstest::rstest;
use serde_json::json;

#[rstest]
#[tokio::test]
async fn test_insert_assigns_generated_keys() {
	// Arrange
	let odim = sqlite_odim().await.unwrap();

	// Act
	let saved = seed_tickets(&odim).await.unwrap();

	// Assert
	let ids: Vec<_> = saved.iter().map(|ticket| ticket.id).collect();
	assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
}

#[rstest]
#[tokio::test]
async fn test_get_decodes_declared_column_types() {
	// Arrange
	let odim = sqlite_odim().await.unwrap();
	let saved = seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();

	// Act
	let login = tickets.get(1_i64).await.unwrap();
	let logout = tickets.get(3_i64).await.unwrap();

	// Assert
	assert_eq!(login, saved[0]);
	assert_eq!(login.labels, vec!["bug", "auth"]);
	assert!(!login.closed);
	assert!(logout.labels.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_get_missing_row_is_not_found() {
	let odim = sqlite_odim().await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();

	let result = tickets.get(42_i64).await;

	assert!(matches!(result, Err(OdimError::NotFound { .. })));
}

#[rstest]
#[case::contains(Query::new().filter("title__contains", "crash"), vec!["Login page crashes", "Crash on logout"])]
#[case::greater_than(Query::new().filter("priority__gt", 2), vec!["Login page crashes", "Crash on logout"])]
#[case::range(Query::new().filter("priority__gte", 1).filter("title__not", "Add dark mode"), vec!["Login page crashes", "Crash on logout"])]
#[case::exact(Query::new().filter("title", "Add dark mode"), vec!["Add dark mode"])]
#[case::labels_present(Query::new().filter("labels__null", false), vec!["Login page crashes", "Add dark mode", "Crash on logout"])]
#[case::case_insensitive(Query::new().filter("title__contains", "CRASH"), vec!["Login page crashes", "Crash on logout"])]
#[case::literal_percent(Query::new().filter("title__contains", "%"), vec![])]
#[case::literal_underscore(Query::new().filter("title__contains", "_"), vec![])]
#[case::unassigned(Query::new().filter("assignee__null", true), vec!["Add dark mode", "Crash on logout"])]
#[case::assigned(Query::new().filter("assignee__null", false), vec!["Login page crashes"])]
#[tokio::test]
async fn test_find_operations(#[case] query: Query, #[case] expected: Vec<&str>) {
	// Arrange
	let odim = sqlite_odim().await.unwrap();
	seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();

	// Act
	let mut found = tickets.find(&query).await.unwrap();
	found.sort_by_key(|ticket| ticket.id);

	// Assert
	let titles: Vec<_> = found.iter().map(|ticket| ticket.title.as_str()).collect();
	assert_eq!(titles, expected);
}

#[rstest]
#[case::unassigned(true, 2)]
#[case::assigned(false, 1)]
#[tokio::test]
async fn test_count_null_checks(#[case] wants_null: bool, #[case] expected: u64) {
	// Arrange
	let odim = sqlite_odim().await.unwrap();
	seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();

	// Act
	let count = tickets.count(&Query::new().filter("assignee__null", wants_null)).await.unwrap();

	// Assert
	assert_eq!(count, expected);
}

#[rstest]
#[tokio::test]
async fn test_save_clears_an_unset_column() {
	// Arrange
	let odim = sqlite_odim().await.unwrap();
	let mut saved = seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();
	let ticket = &mut saved[0];
	ticket.assignee = None;

	// Act
	tickets.bind(ticket).save().await.unwrap();

	// Assert
	let reloaded = tickets.get(1_i64).await.unwrap();
	assert_eq!(reloaded.assignee, None);
	assert_eq!(tickets.count(&Query::new().filter("assignee__null", true)).await.unwrap(), 3);
}

#[rstest]
#[tokio::test]
async fn test_sort_and_paginate() {
	// Arrange
	let odim = sqlite_odim().await.unwrap();
	seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();

	// Act
	let by_priority = tickets
		.find_with(&Query::new(), &SearchParams::new().with_sort("-priority"), false)
		.await
		.unwrap();
	let second_page = tickets
		.find_with(&Query::new(), &SearchParams::new().with_sort("priority").with_offset(1).with_limit(1), false)
		.await
		.unwrap();
	let skip_only = tickets
		.find_with(&Query::new(), &SearchParams::new().with_sort("id").with_offset(2).with_limit(0), false)
		.await
		.unwrap();

	// Assert
	let priorities: Vec<_> = by_priority.iter().map(|ticket| ticket.priority).collect();
	assert_eq!(priorities, vec![5, 3, 1]);
	assert_eq!(second_page.len(), 1);
	assert_eq!(second_page[0].title, "Login page crashes");
	assert_eq!(skip_only.len(), 1);
	assert_eq!(skip_only[0].title, "Crash on logout");
}

#[rstest]
#[tokio::test]
async fn test_unsafe_identifiers_are_rejected() {
	let odim = sqlite_odim().await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();

	let filtered = tickets.find(&Query::new().filter("title; DROP TABLE tickets", 1)).await;
	let sorted = tickets
		.find_with(&Query::new(), &SearchParams::new().with_sort("priority desc"), false)
		.await;

	assert!(matches!(filtered, Err(OdimError::Validation(_))));
	assert!(matches!(sorted, Err(OdimError::Validation(_))));
}

#[rstest]
#[tokio::test]
async fn test_save_existing_row_rewrites_it() {
	// Arrange
	let odim = sqlite_odim().await.unwrap();
	let mut saved = seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();
	let ticket = &mut saved[1];
	ticket.closed = true;
	ticket.labels.push("ui".to_string());

	// Act
	let id = tickets.bind(ticket).save().await.unwrap();

	// Assert
	assert_eq!(id, RecordId::Int(2));
	let reloaded = tickets.get(2_i64).await.unwrap();
	assert!(reloaded.closed);
	assert_eq!(reloaded.labels, vec!["feature", "ui"]);
	assert_eq!(tickets.count(&Query::new()).await.unwrap(), 3);
}

#[rstest]
#[tokio::test]
async fn test_save_with_unknown_key_is_not_modified() {
	let odim = sqlite_odim().await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();
	let mut ghost = Ticket::new("Ghost", 1);
	ghost.id = Some(99);

	let result = tickets.bind(&mut ghost).save().await;

	assert!(matches!(result, Err(OdimError::NotModified { .. })));
	assert_eq!(tickets.count(&Query::new()).await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn test_update_writes_only_selected_fields() {
	// Arrange
	let odim = sqlite_odim().await.unwrap();
	let mut saved = seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();
	let ticket = &mut saved[0];
	ticket.priority = 9;
	ticket.title = "renamed locally".to_string();

	// Act
	let result = tickets
		.bind(ticket)
		.update_with(&Query::new(), false, Some(&["priority".to_string()]))
		.await
		.unwrap();

	// Assert
	assert_eq!(result, WriteResult::new(1, 1));
	let reloaded = tickets.get(1_i64).await.unwrap();
	assert_eq!(reloaded.priority, 9);
	assert_eq!(reloaded.title, "Login page crashes");
}

#[rstest]
#[tokio::test]
async fn test_soft_delete_hides_rows() {
	// Arrange
	let odim = sqlite_odim().await.unwrap();
	seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();

	// Act
	let result = tickets.delete(RecordId::Int(2)).await.unwrap();

	// Assert
	assert_eq!(result.affected, 1);
	assert_eq!(
		ticket_titles(&tickets).await.unwrap(),
		vec!["Login page crashes", "Crash on logout"]
	);
	assert!(matches!(tickets.get(2_i64).await, Err(OdimError::NotFound { .. })));
	let hidden = tickets.get_with(2_i64, &Query::new(), true).await.unwrap();
	assert_eq!(hidden.title, "Add dark mode");
	assert_eq!(tickets.count_with(&Query::new(), true).await.unwrap(), 3);
}

#[rstest]
#[tokio::test]
async fn test_forced_delete_removes_rows() {
	let odim = sqlite_odim().await.unwrap();
	let saved = seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();

	let result = tickets.delete_with(&saved[2], &Query::new(), true).await.unwrap();

	assert_eq!(result.affected, 1);
	assert!(matches!(
		tickets.get_with(3_i64, &Query::new(), true).await,
		Err(OdimError::NotFound { .. })
	));
	assert_eq!(tickets.count_with(&Query::new(), true).await.unwrap(), 2);
}

#[rstest]
#[tokio::test]
async fn test_search_reports_total_and_page() {
	// Arrange
	let odim = sqlite_odim().await.unwrap();
	seed_tickets(&odim).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();
	let query = Query::new().filter("priority__gte", 3);

	// Act
	let response = tickets
		.search(&query, &SearchParams::new().with_sort("-priority").with_limit(1))
		.await
		.unwrap();

	// Assert
	assert_eq!(response.total, 2);
	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].title, "Crash on logout");
	assert_eq!(response.search["limit"], json!(1));
	assert_eq!(response.search["q"], json!({"priority__gte": 3}));
}
