//! # Seedbed - Declarative Seed Data for Document Stores
//!
//! Seedbed moves whole-database document collections between a document
//! store and a human-editable file format, and back. Fixture files are
//! plain YAML or JSON with a small authoring DSL on top; a database can
//! be snapshotted into the same format for diffing and asserting.
//!
//! ## Key Features
//!
//! - **Push**: clear out a database and load a payload file into it
//! - **Pull**: write a database's contents to a portable, diffable file,
//!   buffered or streaming
//! - **Directives**: `$require` composes payload files, `$extend` reuses
//!   templates, `$eval` computes fields, `$set` assigns dotted paths
//! - **Extended types**: identifiers, timestamps, binary and regular
//!   expressions round-trip through plain JSON marker forms
//! - **Namespace filter**: internal store collections never leak into a
//!   pull
//! - **Pluggable storage**: an in-memory store and a persistent redb
//!   store ship in the crate; any backend can implement the provider
//!   trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seedbed::pipeline::{push, pull, PushOptions};
//! use seedbed::store::{memory::InMemoryStore, Store};
//! use seedbed::format;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::new(InMemoryStore::new("test"));
//!
//! // Push a fixture file
//! let raw = format::read_payload(std::path::Path::new("fixtures/people.yml"))?;
//! let options = PushOptions::new().with_source(std::path::Path::new("fixtures/people.yml"));
//! push(&store, &raw, &options)?;
//!
//! // Snapshot the database back out
//! let payload = pull(&store)?;
//! format::write_payload(std::path::Path::new("snapshot.json"), &payload)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`document`] - Documents, values, identifiers and payloads
//! - [`codec`] - Extended-value codec between native and portable forms
//! - [`resolver`] - Directive expansion (`$require`, `$extend`, `$eval`, `$set`)
//! - [`namespace`] - Collection name classification
//! - [`pipeline`] - The push and pull pipelines
//! - [`store`] - Storage backend abstractions and the bundled backends
//! - [`format`] - Payload file reading, writing and tree conversions
//! - [`errors`] - Error types and result definitions
//! - [`common`] - Shared constants and small utilities

use std::sync::LazyLock;
use std::thread::available_parallelism;

pub mod codec;
pub mod common;
pub mod document;
pub mod errors;
pub mod format;
pub mod namespace;
pub mod pipeline;
pub mod resolver;
pub mod store;

pub use document::{CollectionPayload, Document, DocumentId, Value};
pub use errors::{ErrorKind, SeedbedError, SeedbedResult};

pub(crate) static ID_GENERATOR: LazyLock<document::IdGenerator> =
    LazyLock::new(document::IdGenerator::new);

/// Returns the number of available CPU cores.
///
/// The pull pipeline uses this to bound how many collections it fetches
/// concurrently. Falls back to 1 when detection fails.
pub fn get_cpu_count() -> usize {
    available_parallelism()
        .map(|p| p.get())
        .unwrap_or_else(|err| {
            log::warn!(
                "Failed to detect available parallelism: {}. Defaulting to single thread.",
                err
            );
            1
        })
}
