//! Test support for odim
//!
//! [`MemoryDocumentBackend`] stands in for MongoDB behind the
//! `DocumentBackend` seam; [`fixtures`] provides sample schemas and
//! contexts wired to it and to in-memory SQLite.
//!
//! ```
//! use odim_test::fixtures::{Person, document_odim};
//! use odim_test::MemoryDocumentBackend;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let backend = Arc::new(MemoryDocumentBackend::default());
//! let odim = document_odim(Arc::clone(&backend)).await;
//! let people = odim.objects::<Person>().unwrap();
//!
//! let mut ann = Person::new("Ann", 31);
//! people.bind(&mut ann).save().await.unwrap();
//!
//! assert_eq!(backend.documents("people").len(), 1);
//! # });
//! ```

pub mod fixtures;
pub mod memory;

pub use memory::MemoryDocumentBackend;
