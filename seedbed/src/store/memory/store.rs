use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor};
use crate::document::Document;
use crate::errors::{ErrorKind, SeedbedError, SeedbedResult};
use crate::store::{DocumentCursor, InsertResult, StoreProvider, VecCursor};

/// In-memory storage backend.
///
/// Collections live in an insertion-ordered map under a lock, so
/// enumeration order is the order collections were first written and each
/// collection's documents keep their insertion order. All data is lost
/// when the store is dropped; this is the backend for tests and for
/// embedders that only need a scratch target.
///
/// # Usage
/// ```rust,ignore
/// let store = Store::new(InMemoryStore::new("test"));
/// store.insert_many("people", vec![doc! { name: "Axl" }])?;
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store for the given database name.
    pub fn new(name: &str) -> InMemoryStore {
        InMemoryStore {
            inner: Arc::new(InMemoryStoreInner {
                name: name.to_string(),
                closed: AtomicBool::new(false),
                collections: atomic(IndexMap::new()),
            }),
        }
    }
}

struct InMemoryStoreInner {
    name: String,
    closed: AtomicBool,
    collections: Atomic<IndexMap<String, Vec<Document>>>,
}

impl InMemoryStoreInner {
    fn ensure_open(&self) -> SeedbedResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            log::error!("Store '{}' is already closed", self.name);
            return Err(SeedbedError::new(
                &format!("Store '{}' is already closed", self.name),
                ErrorKind::StoreError,
            ));
        }
        Ok(())
    }
}

impl StoreProvider for InMemoryStore {
    fn database_name(&self) -> SeedbedResult<String> {
        Ok(self.inner.name.clone())
    }

    fn list_collections(&self) -> SeedbedResult<Vec<String>> {
        self.inner.ensure_open()?;
        Ok(self
            .inner
            .collections
            .read_with(|collections| collections.keys().cloned().collect()))
    }

    fn find_all(&self, collection: &str) -> SeedbedResult<DocumentCursor> {
        self.inner.ensure_open()?;
        let documents = self
            .inner
            .collections
            .read_with(|collections| collections.get(collection).cloned())
            .unwrap_or_default();
        Ok(DocumentCursor::new(VecCursor::new(documents)))
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> SeedbedResult<InsertResult> {
        self.inner.ensure_open()?;

        let mut ids = Vec::with_capacity(documents.len());
        let mut prepared = Vec::with_capacity(documents.len());
        for mut document in documents {
            ids.push(document.ensure_id());
            prepared.push(document);
        }

        self.inner.collections.write_with(|collections| {
            collections
                .entry(collection.to_string())
                .or_default()
                .extend(prepared);
        });

        log::debug!(
            "Inserted {} documents into '{}.{}'",
            ids.len(),
            self.inner.name,
            collection
        );
        Ok(InsertResult::new(ids))
    }

    fn drop_database(&self) -> SeedbedResult<()> {
        self.inner.ensure_open()?;
        self.inner.collections.write_with(|collections| {
            collections.clear();
        });
        log::warn!("Dropped database '{}'", self.inner.name);
        Ok(())
    }

    fn is_closed(&self) -> SeedbedResult<bool> {
        Ok(self.inner.closed.load(Ordering::Relaxed))
    }

    fn close(&self) -> SeedbedResult<()> {
        self.inner.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}
