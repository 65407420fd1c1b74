//! Storage backend abstractions.
//!
//! The pipelines never talk to a concrete database; they work against the
//! [StoreProvider] contract, which models the driver primitives the tool
//! needs: enumerate collections, stream one collection's documents in
//! retrieval order, insert a batch, destroy the database. [Store] wraps a
//! provider in an `Arc` so one connection handle can be shared across the
//! pull workers.
//!
//! Two providers ship with the crate: [memory::InMemoryStore] for tests
//! and embedders, and [redb::RedbStore] for a persistent single-file
//! database.

pub mod memory;
pub mod redb;

use crate::document::{Document, Value};
use crate::errors::SeedbedResult;
use std::ops::Deref;
use std::sync::Arc;

/// Low-level interface a storage backend must implement.
///
/// # Key Responsibilities
/// - **Enumeration**: list every collection name the database holds
/// - **Retrieval**: stream one collection's documents in store order
/// - **Insertion**: append a batch of documents to a collection
/// - **Reset**: destroy all collections at once
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; the pull pipeline fetches several
/// collections concurrently through one shared handle.
pub trait StoreProvider: Send + Sync {
    /// Returns the name of the database this handle is connected to.
    fn database_name(&self) -> SeedbedResult<String>;

    /// Returns every collection name in the database.
    ///
    /// The order is deterministic for a given database state. No
    /// filtering happens here; internal names are listed too and callers
    /// apply the namespace filter.
    fn list_collections(&self) -> SeedbedResult<Vec<String>>;

    /// Opens a cursor over all documents of a collection, in the store's
    /// retrieval order. A collection that does not exist yields an empty
    /// cursor.
    fn find_all(&self, collection: &str) -> SeedbedResult<DocumentCursor>;

    /// Inserts a batch of documents into a collection, creating it if
    /// needed. Documents without an `_id` receive a generated
    /// [crate::document::DocumentId]. The batch is appended in the given
    /// order.
    fn insert_many(&self, collection: &str, documents: Vec<Document>)
        -> SeedbedResult<InsertResult>;

    /// Destroys every collection in the database. Irreversible.
    fn drop_database(&self) -> SeedbedResult<()>;

    /// Checks if the store has been closed.
    fn is_closed(&self) -> SeedbedResult<bool>;

    /// Closes the store. Further operations fail.
    fn close(&self) -> SeedbedResult<()>;
}

/// Shared handle to a storage backend.
///
/// Wraps a concrete [StoreProvider] in an `Arc`; cloning is cheap and the
/// same handle can be used from several threads. `Deref` exposes the
/// provider methods directly:
///
/// ```rust,ignore
/// let store = Store::new(InMemoryStore::new("test"));
/// let names = store.list_collections()?;
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn StoreProvider>,
}

impl Store {
    /// Creates a new `Store` wrapping a provider implementation.
    pub fn new<T: StoreProvider + 'static>(inner: T) -> Self {
        Store {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for Store {
    type Target = Arc<dyn StoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Trait for implementing document iteration from a cursor.
///
/// Implementations yield documents one at a time in the store's retrieval
/// order; a failed read surfaces as an `Err` item and ends the stream.
pub trait DocumentCursorProvider: Send {
    /// Get the next document.
    fn next_document(&mut self) -> Option<SeedbedResult<Document>>;
}

/// Cursor over one collection's documents.
pub struct DocumentCursor {
    inner: Box<dyn DocumentCursorProvider>,
}

impl DocumentCursor {
    pub fn new<T: DocumentCursorProvider + 'static>(inner: T) -> Self {
        DocumentCursor {
            inner: Box::new(inner),
        }
    }

    /// Drains the cursor into a vector, failing on the first read error.
    pub fn collect_documents(self) -> SeedbedResult<Vec<Document>> {
        self.collect()
    }
}

impl Iterator for DocumentCursor {
    type Item = SeedbedResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next_document()
    }
}

/// Cursor over an already-materialized batch of documents.
///
/// Backends that read a whole collection in one shot (the in-memory store,
/// the redb store's range scan) wrap their buffers in this.
pub struct VecCursor {
    documents: std::vec::IntoIter<Document>,
}

impl VecCursor {
    pub fn new(documents: Vec<Document>) -> Self {
        VecCursor {
            documents: documents.into_iter(),
        }
    }
}

impl DocumentCursorProvider for VecCursor {
    fn next_document(&mut self) -> Option<SeedbedResult<Document>> {
        self.documents.next().map(Ok)
    }
}

/// The result of a batch insertion.
///
/// Carries the `_id` of every inserted document, generated or supplied,
/// in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertResult {
    ids: Vec<Value>,
}

impl InsertResult {
    /// Creates a new `InsertResult` with the affected ids.
    pub fn new(ids: Vec<Value>) -> Self {
        Self { ids }
    }

    /// The `_id` values of the inserted documents.
    pub fn ids(&self) -> &[Value] {
        &self.ids
    }

    /// Number of documents inserted.
    pub fn inserted_count(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::errors::{ErrorKind, SeedbedError};

    struct MockStore;

    impl StoreProvider for MockStore {
        fn database_name(&self) -> SeedbedResult<String> {
            Ok("mock".to_string())
        }

        fn list_collections(&self) -> SeedbedResult<Vec<String>> {
            Ok(vec!["people".to_string()])
        }

        fn find_all(&self, _collection: &str) -> SeedbedResult<DocumentCursor> {
            Ok(DocumentCursor::new(VecCursor::new(vec![doc! { a: 1 }])))
        }

        fn insert_many(
            &self,
            _collection: &str,
            documents: Vec<Document>,
        ) -> SeedbedResult<InsertResult> {
            let mut ids = Vec::new();
            for mut doc in documents {
                ids.push(doc.ensure_id());
            }
            Ok(InsertResult::new(ids))
        }

        fn drop_database(&self) -> SeedbedResult<()> {
            Ok(())
        }

        fn is_closed(&self) -> SeedbedResult<bool> {
            Ok(false)
        }

        fn close(&self) -> SeedbedResult<()> {
            Err(SeedbedError::new(
                "mock cannot close",
                ErrorKind::InvalidOperation,
            ))
        }
    }

    #[test]
    fn test_store_wraps_provider() {
        let store = Store::new(MockStore);
        assert_eq!(store.database_name().unwrap(), "mock");
        assert_eq!(store.list_collections().unwrap(), vec!["people"]);
        assert!(!store.is_closed().unwrap());
        assert!(store.close().is_err());
    }

    #[test]
    fn test_store_cloning_shares_provider() {
        let store1 = Store::new(MockStore);
        let store2 = store1.clone();
        assert_eq!(store1.database_name().unwrap(), store2.database_name().unwrap());
    }

    #[test]
    fn test_vec_cursor_preserves_order() {
        let cursor = DocumentCursor::new(VecCursor::new(vec![
            doc! { n: 1 },
            doc! { n: 2 },
            doc! { n: 3 },
        ]));
        let docs = cursor.collect_documents().unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].get("n").unwrap(), Value::I64(1));
        assert_eq!(docs[2].get("n").unwrap(), Value::I64(3));
    }

    #[test]
    fn test_insert_result() {
        let result = InsertResult::new(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(result.inserted_count(), 2);
        assert_eq!(result.ids()[0], Value::from("a"));
    }

    #[test]
    fn test_mock_insert_assigns_ids() {
        let store = Store::new(MockStore);
        let result = store
            .insert_many("people", vec![doc! { name: "Axl" }])
            .unwrap();
        assert_eq!(result.inserted_count(), 1);
        assert!(matches!(result.ids()[0], Value::Id(_)));
    }
}
