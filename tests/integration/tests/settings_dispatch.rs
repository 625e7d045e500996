//! Settings loading and schema to connection dispatch

use odim::conf::{DATABASES_ENV, Settings};
use odim::db::{Backend, Odim, OdimError, RecordId, Result, Schema, SchemaMeta};
use odim_test::MemoryDocumentBackend;
use odim_test::fixtures::{Note, TICKETS_DDL, Ticket};
use rstest::rstest;
use serde::{Deserialize, Serialize};
use serial_test::serial;
use std::sync::Arc;

const SETTINGS_TOML: &str = r#"
[databases]
reports = "sqlite::memory:"
archive = "mongodb://archive.local:27017/archive"
docs = { protocol = "mongodb", host = "localhost", port = 27017, database = "odim_test" }
sql = "sqlite::memory:"

[retry]
attempts = 1
delay_ms = 1
"#;

macro_rules! bound_schema {
	($name:ident, $meta:expr) => {
		#[derive(Debug, Clone, Serialize, Deserialize)]
		struct $name {
			id: Option<i64>,
		}

		impl Schema for $name {
			fn meta() -> SchemaMeta {
				$meta
			}

			fn id(&self) -> Option<RecordId> {
				self.id.map(RecordId::Int)
			}

			fn set_id(&mut self, id: RecordId) -> Result<()> {
				self.id = Some(id.as_i64()?);
				Ok(())
			}
		}
	};
}

bound_schema!(UriBound, SchemaMeta::new("UriBound").uri("sqlite::memory:"));
bound_schema!(Misbound, SchemaMeta::new("Misbound").document().connection("sql"));
bound_schema!(Dangling, SchemaMeta::new("Dangling").connection("nowhere"));
bound_schema!(Unserved, SchemaMeta::new("Unserved").uri("redis://cache.local:6379"));
bound_schema!(Unbound, SchemaMeta::new("Unbound"));
bound_schema!(Reporting, SchemaMeta::new("Reporting").relational().table("reports"));

fn toml_odim() -> Odim {
	Odim::new(Settings::from_toml_str(SETTINGS_TOML).unwrap())
}

#[rstest]
#[tokio::test]
async fn test_family_binding_uses_first_matching_alias() {
	// Arrange
	let odim = toml_odim();
	let archive = Arc::new(MemoryDocumentBackend::new("archive"));
	let docs = Arc::new(MemoryDocumentBackend::new("odim_test"));
	odim.install_document_backend("archive", archive.clone()).await;
	odim.install_document_backend("docs", docs.clone()).await;
	let notes = odim.objects::<Note>().unwrap();
	let mut note = Note {
		id: None,
		body: "remember the milk".to_string(),
	};

	// Act
	notes.bind(&mut note).save().await.unwrap();

	// Assert
	assert_eq!(archive.documents("Note").len(), 1);
	assert!(docs.documents("Note").is_empty());
	assert_eq!(odim.backend_of::<Reporting>().unwrap(), Backend::Relational);
}

#[rstest]
#[case::explicit_alias(odim_backend::<Ticket>, Backend::Relational)]
#[case::raw_uri(odim_backend::<UriBound>, Backend::Relational)]
#[case::document_family(odim_backend::<Note>, Backend::Document)]
fn test_backend_resolution(#[case] resolve: fn(&Odim) -> Result<Backend>, #[case] expected: Backend) {
	let odim = toml_odim();

	assert_eq!(resolve(&odim).unwrap(), expected);
}

fn odim_backend<M: Schema>(odim: &Odim) -> Result<Backend> {
	odim.backend_of::<M>()
}

#[rstest]
#[case::family_mismatch(odim_backend::<Misbound>)]
#[case::unknown_alias(odim_backend::<Dangling>)]
#[case::unsupported_protocol(odim_backend::<Unserved>)]
#[case::no_binding(odim_backend::<Unbound>)]
fn test_unresolvable_schemas(#[case] resolve: fn(&Odim) -> Result<Backend>) {
	let odim = toml_odim();

	let result = resolve(&odim);

	assert!(matches!(result, Err(OdimError::Configuration(_))));
}

#[rstest]
#[tokio::test]
async fn test_missing_family_connection_is_a_configuration_error() {
	let odim = Odim::new(Settings::new().with_database("sql", "sqlite::memory:"));

	let result = odim.objects::<Note>();

	assert!(matches!(result, Err(OdimError::Configuration(_))));
}

#[rstest]
#[serial(databases_env)]
#[tokio::test]
async fn test_settings_from_environment_drive_a_relational_schema() {
	// Arrange
	// SAFETY: serialized with every other test touching DATABASES
	unsafe {
		std::env::set_var(DATABASES_ENV, r#"{"sql": "sqlite::memory:"}"#);
	}
	let settings = Settings::from_env();
	unsafe {
		std::env::remove_var(DATABASES_ENV);
	}
	let odim = Odim::new(settings.unwrap());
	let pool = odim.connections().sql_pool("sql").await.unwrap();
	pool.execute_script(TICKETS_DDL).await.unwrap();
	let tickets = odim.objects::<Ticket>().unwrap();
	let mut ticket = Ticket::new("Configured from the environment", 2);

	// Act
	tickets.bind(&mut ticket).save().await.unwrap();

	// Assert
	assert_eq!(ticket.id, Some(1));
	assert_eq!(tickets.get(1_i64).await.unwrap(), ticket);
	odim.shutdown().await;
}
