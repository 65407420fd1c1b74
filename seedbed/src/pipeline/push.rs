use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::codec::ExtendedCodec;
use crate::document::Document;
use crate::errors::SeedbedResult;
use crate::resolver;
use crate::store::{InsertResult, Store};

/// Options for a [push] call.
///
/// `drop_database` defaults to `true`, matching the tool's original
/// replace-the-database behavior; callers that want to accumulate data
/// opt out with [PushOptions::keep_existing].
#[derive(Clone, Debug)]
pub struct PushOptions {
    /// Destroy every existing collection before inserting.
    pub drop_database: bool,
    /// Path of the file the payload was parsed from; anchors `$require`
    /// resolution. `None` makes `$require` a configuration error.
    pub source: Option<PathBuf>,
}

impl PushOptions {
    pub fn new() -> Self {
        PushOptions {
            drop_database: true,
            source: None,
        }
    }

    /// Keeps existing collections instead of dropping the database.
    pub fn keep_existing(mut self) -> Self {
        self.drop_database = false;
        self
    }

    /// Sets the payload's source file, the anchor for `$require`.
    pub fn with_source(mut self, source: &Path) -> Self {
        self.source = Some(source.to_path_buf());
        self
    }
}

impl Default for PushOptions {
    fn default() -> Self {
        PushOptions::new()
    }
}

/// Pushes a raw payload tree into a store.
///
/// Steps, in order:
///
/// 1. When `options.drop_database` is set, every existing collection is
///    destroyed. This is irreversible, and a failure after this point
///    leaves the database partially rebuilt: the operation is not safely
///    cancelable once the drop has run.
/// 2. The directive resolver expands the payload. Any resolution failure
///    aborts here, before a single insert.
/// 3. Each collection, in declared order: empty collections are skipped
///    without an insert call; otherwise every document is decoded through
///    the extended-value codec and the whole collection inserted as one
///    batch.
///
/// Returns the per-collection insertion results. A failed insert surfaces
/// immediately; collections inserted before it are not rolled back.
pub fn push(
    store: &Store,
    raw: &Document,
    options: &PushOptions,
) -> SeedbedResult<IndexMap<String, InsertResult>> {
    if options.drop_database {
        store.drop_database()?;
    }

    let payload = resolver::expand(raw, options.source.as_deref())?;

    let codec = ExtendedCodec::new();
    let mut results = IndexMap::new();
    for (name, documents) in payload {
        if documents.is_empty() {
            log::debug!("Skipping empty collection '{}'", name);
            continue;
        }

        let decoded: SeedbedResult<Vec<Document>> =
            documents.iter().map(|doc| codec.decode(doc)).collect();
        let result = store.insert_many(&name, decoded?)?;
        log::info!(
            "Inserted {} documents into '{}'",
            result.inserted_count(),
            name
        );
        results.insert(name, result);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::document::Value;
    use crate::errors::ErrorKind;
    use crate::store::memory::InMemoryStore;

    fn memory_store() -> Store {
        Store::new(InMemoryStore::new("test"))
    }

    #[test]
    fn test_push_inserts_documents() {
        let store = memory_store();
        let raw = doc! { sample: [ { x: 1 } ] };
        let results = push(&store, &raw, &PushOptions::new()).unwrap();
        assert_eq!(results["sample"].inserted_count(), 1);

        let docs = store.find_all("sample").unwrap().collect_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("x").unwrap(), Value::I64(1));
    }

    #[test]
    fn test_push_decodes_markers() {
        let store = memory_store();
        let raw = doc! {
            people: [ { "_id": { "$oid": "561d87b8b260cf35147998ca" } } ],
        };
        push(&store, &raw, &PushOptions::new()).unwrap();

        let docs = store.find_all("people").unwrap().collect_documents().unwrap();
        assert!(matches!(docs[0].get("_id").unwrap(), Value::Id(_)));
    }

    #[test]
    fn test_push_skips_empty_collections() {
        let store = memory_store();
        let raw = doc! { empty: [], full: [ { a: 1 } ] };
        let results = push(&store, &raw, &PushOptions::new()).unwrap();
        assert!(!results.contains_key("empty"));
        assert_eq!(results["full"].inserted_count(), 1);
        // no insert call means the collection never appears in the store
        assert_eq!(store.list_collections().unwrap(), vec!["full"]);
    }

    #[test]
    fn test_drop_then_accumulate() {
        let store = memory_store();
        let raw = doc! { sample: [ { a: 1 } ] };

        push(&store, &raw, &PushOptions::new()).unwrap();
        push(&store, &raw, &PushOptions::new().keep_existing()).unwrap();
        let docs = store.find_all("sample").unwrap().collect_documents().unwrap();
        assert_eq!(docs.len(), 2);

        push(&store, &raw, &PushOptions::new()).unwrap();
        let docs = store.find_all("sample").unwrap().collect_documents().unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_resolution_failure_inserts_nothing() {
        let store = memory_store();
        let raw = doc! {
            "$require": "./child.yml",
            people: [ { name: "Axl" } ],
        };
        let err = push(&store, &raw, &PushOptions::new()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
        assert!(store.list_collections().unwrap().is_empty());
    }

    #[test]
    fn test_push_expands_directives() {
        let store = memory_store();
        let raw = doc! {
            "$person": { species: "human" },
            people: [ { "$extend": "$person", name: "Axl" } ],
        };
        push(&store, &raw, &PushOptions::new()).unwrap();
        let docs = store.find_all("people").unwrap().collect_documents().unwrap();
        assert_eq!(docs[0].get("species").unwrap(), Value::from("human"));
        // the extension table itself is never persisted
        assert_eq!(store.list_collections().unwrap(), vec!["people"]);
    }
}
