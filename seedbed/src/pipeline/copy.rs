use indexmap::IndexMap;

use crate::errors::SeedbedResult;
use crate::namespace;
use crate::store::{InsertResult, Store};

/// Copies every data collection from one store into another.
///
/// The target database is dropped first, then each surviving source
/// collection is transferred in cursor order. Documents travel in their
/// native form; no codec pass is involved between two stores. Like
/// [crate::pipeline::push], a failure midway leaves already-copied
/// collections in place.
pub fn copy(source: &Store, target: &Store) -> SeedbedResult<IndexMap<String, InsertResult>> {
    target.drop_database()?;

    let mut results = IndexMap::new();
    for name in source.list_collections()? {
        if !namespace::is_data(&name) {
            continue;
        }

        let documents = source.find_all(&name)?.collect_documents()?;
        if documents.is_empty() {
            log::debug!("Skipping empty collection '{}'", name);
            continue;
        }

        let result = target.insert_many(&name, documents)?;
        log::info!(
            "Copied {} documents into '{}'",
            result.inserted_count(),
            name
        );
        results.insert(name, result);
    }

    Ok(results)
}
