use ::redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::codec::ExtendedCodec;
use crate::document::{Document, Value};
use crate::errors::{ErrorKind, SeedbedError, SeedbedResult};
use crate::format;
use crate::store::{DocumentCursor, InsertResult, StoreProvider, VecCursor};

/// Documents, keyed by collection name and an insertion sequence number.
/// The sequence makes the range scan return documents in the order they
/// were inserted, across process restarts.
const DOCUMENTS: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("documents");

/// Collection catalog: name to the next free sequence number.
const COLLECTIONS: TableDefinition<&str, u64> = TableDefinition::new("collections");

/// Persistent storage backend using a redb database file.
///
/// Documents are stored in their portable (codec-encoded) JSON form, so a
/// database file never contains process-local values; the native form is
/// rebuilt on every read.
///
/// # Usage
/// ```rust,ignore
/// let store = Store::new(RedbStore::open(Path::new("fixtures.redb"))?);
/// let names = store.list_collections()?;
/// ```
#[derive(Clone)]
pub struct RedbStore {
    inner: Arc<RedbStoreInner>,
}

struct RedbStoreInner {
    name: String,
    db: Database,
    closed: AtomicBool,
    codec: ExtendedCodec,
}

impl RedbStore {
    /// Opens or creates a redb database file.
    pub fn open(path: &Path) -> SeedbedResult<RedbStore> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("seedbed")
            .to_string();

        let db = Database::create(path)
            .map_err(|err| store_err(&format!("Cannot open database {}", path.display()), err))?;

        // make sure both tables exist so later read transactions never
        // observe a missing table
        let txn = db
            .begin_write()
            .map_err(|err| store_err("Cannot begin transaction", err))?;
        {
            txn.open_table(DOCUMENTS)
                .map_err(|err| store_err("Cannot open documents table", err))?;
            txn.open_table(COLLECTIONS)
                .map_err(|err| store_err("Cannot open collections table", err))?;
        }
        txn.commit()
            .map_err(|err| store_err("Cannot commit transaction", err))?;

        log::debug!("Opened redb store at {}", path.display());
        Ok(RedbStore {
            inner: Arc::new(RedbStoreInner {
                name,
                db,
                closed: AtomicBool::new(false),
                codec: ExtendedCodec::new(),
            }),
        })
    }
}

impl RedbStoreInner {
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

    fn encode_document(&self, document: &Document) -> SeedbedResult<Vec<u8>> {
        let portable = self.codec.encode(document)?;
        let tree = format::document_to_json(&portable)?;
        Ok(serde_json::to_vec(&tree)?)
    }

    fn decode_document(&self, bytes: &[u8]) -> SeedbedResult<Document> {
        let tree: serde_json::Value = serde_json::from_slice(bytes)?;
        match format::json_to_value(&tree)? {
            Value::Document(portable) => self.codec.decode(&portable),
            _ => Err(SeedbedError::new(
                "Stored entry is not a document",
                ErrorKind::StoreError,
            )),
        }
    }
}

impl StoreProvider for RedbStore {
    fn database_name(&self) -> SeedbedResult<String> {
        Ok(self.inner.name.clone())
    }

    fn list_collections(&self) -> SeedbedResult<Vec<String>> {
        self.inner.ensure_open()?;
        let txn = self
            .inner
            .db
            .begin_read()
            .map_err(|err| store_err("Cannot begin read transaction", err))?;
        let catalog = txn
            .open_table(COLLECTIONS)
            .map_err(|err| store_err("Cannot open collections table", err))?;

        let mut names = Vec::new();
        for entry in catalog
            .iter()
            .map_err(|err| store_err("Cannot enumerate collections", err))?
        {
            let (key, _) = entry.map_err(|err| store_err("Cannot enumerate collections", err))?;
            names.push(key.value().to_string());
        }
        Ok(names)
    }

    fn find_all(&self, collection: &str) -> SeedbedResult<DocumentCursor> {
        self.inner.ensure_open()?;
        let txn = self
            .inner
            .db
            .begin_read()
            .map_err(|err| store_err("Cannot begin read transaction", err))?;
        let table = txn
            .open_table(DOCUMENTS)
            .map_err(|err| store_err("Cannot open documents table", err))?;

        let mut documents = Vec::new();
        for entry in table
            .range((collection, 0u64)..=(collection, u64::MAX))
            .map_err(|err| store_err("Cannot scan collection", err))?
        {
            let (_, bytes) = entry.map_err(|err| store_err("Cannot scan collection", err))?;
            documents.push(self.inner.decode_document(bytes.value())?);
        }
        Ok(DocumentCursor::new(VecCursor::new(documents)))
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> SeedbedResult<InsertResult> {
        self.inner.ensure_open()?;

        let mut ids = Vec::with_capacity(documents.len());
        let mut encoded = Vec::with_capacity(documents.len());
        for mut document in documents {
            ids.push(document.ensure_id());
            encoded.push(self.inner.encode_document(&document)?);
        }

        let txn = self
            .inner
            .db
            .begin_write()
            .map_err(|err| store_err("Cannot begin transaction", err))?;
        {
            let mut table = txn
                .open_table(DOCUMENTS)
                .map_err(|err| store_err("Cannot open documents table", err))?;
            let mut catalog = txn
                .open_table(COLLECTIONS)
                .map_err(|err| store_err("Cannot open collections table", err))?;

            let next = catalog
                .get(collection)
                .map_err(|err| store_err("Cannot read collection sequence", err))?
                .map(|guard| guard.value())
                .unwrap_or(0);

            for (offset, bytes) in encoded.iter().enumerate() {
                table
                    .insert((collection, next + offset as u64), bytes.as_slice())
                    .map_err(|err| store_err("Cannot insert document", err))?;
            }
            catalog
                .insert(collection, next + encoded.len() as u64)
                .map_err(|err| store_err("Cannot update collection sequence", err))?;
        }
        txn.commit()
            .map_err(|err| store_err("Cannot commit transaction", err))?;

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
        let txn = self
            .inner
            .db
            .begin_write()
            .map_err(|err| store_err("Cannot begin transaction", err))?;
        txn.delete_table(DOCUMENTS)
            .map_err(|err| store_err("Cannot drop documents table", err))?;
        txn.delete_table(COLLECTIONS)
            .map_err(|err| store_err("Cannot drop collections table", err))?;
        {
            txn.open_table(DOCUMENTS)
                .map_err(|err| store_err("Cannot recreate documents table", err))?;
            txn.open_table(COLLECTIONS)
                .map_err(|err| store_err("Cannot recreate collections table", err))?;
        }
        txn.commit()
            .map_err(|err| store_err("Cannot commit transaction", err))?;
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

fn store_err(context: &str, err: impl std::fmt::Display) -> SeedbedError {
    log::error!("{}: {}", context, err);
    SeedbedError::new(&format!("{}: {}", context, err), ErrorKind::StoreError)
}
