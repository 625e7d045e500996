//! Hook pipeline around document driver operations

use odim::db::{OdimError, Query, RecordId, Schema};
use odim::signals::{HookContext, HookError, HookEvent, Subject};
use odim_integration_tests::seed_people;
use odim_test::MemoryDocumentBackend;
use odim_test::fixtures::{Person, document_odim, memory_backend};
use rstest::rstest;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[rstest]
#[tokio::test]
async fn test_pre_save_rewrites_the_written_instance(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(Arc::clone(&memory_backend)).await;
	let hooks = odim.hooks::<Person>().unwrap();
	hooks.connect(HookEvent::PreSave, |subject: Subject<Person>, _ctx| async move {
		let mut person = subject.into_instance().unwrap_or_else(|| Person::new("?", 0));
		person.name = person.name.to_uppercase();
		Ok(Some(Subject::Instance(person)))
	});
	let people = odim.objects::<Person>().unwrap();
	let mut ann = Person::new("Ann", 31);

	// Act
	people.bind(&mut ann).save().await.unwrap();

	// Assert
	assert_eq!(ann.name, "ANN");
	assert_eq!(people.get(ann.id().unwrap()).await.unwrap().name, "ANN");
}

#[rstest]
#[tokio::test]
async fn test_save_context_reports_creation(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	let seen = Arc::new(Mutex::new(Vec::new()));
	let log = Arc::clone(&seen);
	odim.hooks::<Person>()
		.unwrap()
		.connect(HookEvent::PostSave, move |_subject: Subject<Person>, ctx: HookContext| {
			let log = Arc::clone(&log);
			async move {
				log.lock().unwrap().push(ctx.created);
				Ok(None)
			}
		});
	let people = odim.objects::<Person>().unwrap();
	let mut ann = Person::new("Ann", 31);

	people.bind(&mut ann).save().await.unwrap();
	ann.age = 32;
	people.bind(&mut ann).save().await.unwrap();
	people.bind(&mut ann).update().await.unwrap();

	assert_eq!(*seen.lock().unwrap(), vec![Some(true), Some(false), Some(false)]);
}

#[rstest]
#[tokio::test]
async fn test_pre_init_sees_the_raw_record(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(memory_backend).await;
	seed_people(&odim).await.unwrap();
	odim.hooks::<Person>()
		.unwrap()
		.connect(HookEvent::PreInit, |subject: Subject<Person>, _ctx| async move {
			let mut record = subject.into_record().unwrap_or_default();
			if record.get("email").is_none_or(|email| email.is_null()) {
				record.insert("email".to_string(), json!("unknown@example.com"));
			}
			Ok(Some(Subject::Record(record)))
		});
	let people = odim.objects::<Person>().unwrap();

	// Act
	let bob = people.find(&Query::new().filter("name", "bob")).await.unwrap();

	// Assert
	assert_eq!(bob.len(), 1);
	assert_eq!(bob[0].email.as_deref(), Some("unknown@example.com"));
}

#[rstest]
#[tokio::test]
async fn test_post_init_runs_for_every_loaded_record(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	seed_people(&odim).await.unwrap();
	let loaded = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&loaded);
	odim.hooks::<Person>()
		.unwrap()
		.connect(HookEvent::PostInit, move |_subject: Subject<Person>, _ctx| {
			counter.fetch_add(1, Ordering::SeqCst);
			async move { Ok(None) }
		});
	let people = odim.objects::<Person>().unwrap();

	let all = people.find(&Query::new()).await.unwrap();

	assert_eq!(all.len(), 3);
	assert_eq!(loaded.load(Ordering::SeqCst), 3);
}

#[rstest]
#[tokio::test]
async fn test_remove_hooks_load_the_record_first(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(memory_backend).await;
	let saved = seed_people(&odim).await.unwrap();
	let removed = Arc::new(Mutex::new(Vec::new()));
	let log = Arc::clone(&removed);
	odim.hooks::<Person>()
		.unwrap()
		.connect(HookEvent::PreRemove, move |subject: Subject<Person>, ctx: HookContext| {
			let log = Arc::clone(&log);
			async move {
				let name = subject.as_instance().map(|p| p.name.clone()).unwrap_or_default();
				log.lock().unwrap().push((name, ctx.softdelete));
				Ok(None)
			}
		});
	let people = odim.objects::<Person>().unwrap();

	// Act
	people.delete(saved[0].id().unwrap()).await.unwrap();
	people.delete_with(saved[1].id().unwrap(), &Query::new(), true).await.unwrap();

	// Assert
	assert_eq!(
		*removed.lock().unwrap(),
		vec![("Ann".to_string(), Some(true)), ("bob".to_string(), Some(false))]
	);
}

#[rstest]
#[tokio::test]
async fn test_delete_with_hooks_of_missing_record_is_not_found(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	odim.hooks::<Person>()
		.unwrap()
		.connect(HookEvent::PostRemove, |_subject: Subject<Person>, _ctx| async move { Ok(None) });
	let people = odim.objects::<Person>().unwrap();

	let result = people.delete(RecordId::from(bson::oid::ObjectId::new())).await;

	assert!(matches!(result, Err(OdimError::NotFound { .. })));
}

#[rstest]
#[tokio::test]
async fn test_rejecting_hook_aborts_the_write(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(Arc::clone(&memory_backend)).await;
	odim.hooks::<Person>()
		.unwrap()
		.connect(HookEvent::PreSave, |subject: Subject<Person>, ctx: HookContext| async move {
			match subject.as_instance() {
				Some(person) if person.age < 0 => {
					Err(HookError::rejected(HookEvent::PreSave, ctx.schema, "age must not be negative"))
				}
				_ => Ok(None),
			}
		});
	let people = odim.objects::<Person>().unwrap();
	let mut invalid = Person::new("Nobody", -1);

	// Act
	let result = people.bind(&mut invalid).save().await;

	// Assert
	assert!(matches!(result, Err(OdimError::Hook(HookError::Rejected { .. }))));
	assert!(memory_backend.documents("people").is_empty());
	assert!(invalid.id.is_none());
}

#[rstest]
#[tokio::test]
async fn test_construct_runs_validation_hooks(memory_backend: Arc<MemoryDocumentBackend>) {
	// Arrange
	let odim = document_odim(memory_backend).await;
	let hooks = odim.hooks::<Person>().unwrap();
	hooks.connect(HookEvent::PreValidate, |subject: Subject<Person>, _ctx| async move {
		let mut record = subject.into_record().unwrap_or_default();
		if let Some(name) = record.get("name").and_then(|name| name.as_str()) {
			let trimmed = name.trim().to_string();
			record.insert("name".to_string(), json!(trimmed));
		}
		Ok(Some(Subject::Record(record)))
	});
	hooks.connect(HookEvent::PostValidate, |subject: Subject<Person>, ctx: HookContext| async move {
		match subject.as_instance() {
			Some(person) if person.name.is_empty() => {
				Err(HookError::rejected(HookEvent::PostValidate, ctx.schema, "name is required"))
			}
			_ => Ok(None),
		}
	});
	let people = odim.objects::<Person>().unwrap();
	let raw = |value: serde_json::Value| value.as_object().cloned().unwrap_or_default();

	// Act
	let valid = people.construct(raw(json!({"name": "  Ann ", "age": 31}))).await;
	let blank = people.construct(raw(json!({"name": "   ", "age": 31}))).await;
	let malformed = people.construct(raw(json!({"name": "Ann"}))).await;

	// Assert
	assert_eq!(valid.unwrap().name, "Ann");
	assert!(matches!(blank, Err(OdimError::Hook(_))));
	assert!(matches!(malformed, Err(OdimError::Serialization(_))));
}

#[rstest]
#[tokio::test]
async fn test_multi_event_hook(memory_backend: Arc<MemoryDocumentBackend>) {
	let odim = document_odim(memory_backend).await;
	let fired = Arc::new(Mutex::new(Vec::new()));
	let log = Arc::clone(&fired);
	let connected = odim.hooks::<Person>().unwrap().connect_many(
		&[HookEvent::PreSave, HookEvent::PostSave, HookEvent::PreRemove],
		move |_subject: Subject<Person>, ctx: HookContext| {
			let log = Arc::clone(&log);
			async move {
				log.lock().unwrap().push(ctx.created.is_some());
				Ok(None)
			}
		},
	);
	let people = odim.objects::<Person>().unwrap();
	let mut ann = Person::new("Ann", 31);

	people.bind(&mut ann).save().await.unwrap();
	people.bind(&mut ann).delete(false).await.unwrap();

	assert_eq!(connected, 3);
	assert_eq!(*fired.lock().unwrap(), vec![true, true, false]);
}
