use std::io::Write;

use crate::codec::ExtendedCodec;
use crate::document::{CollectionPayload, Document};
use crate::errors::{ErrorKind, SeedbedError, SeedbedResult};
use crate::format;
use crate::get_cpu_count;
use crate::namespace;
use crate::store::Store;

/// Pulls a whole database into a buffered payload.
///
/// Collections are enumerated, internal names are dropped by the
/// namespace filter, and the surviving collections are fetched in
/// parallel, bounded by the CPU count. Documents keep their store
/// retrieval order within each collection and collections keep their
/// enumeration order in the result. Every document is encoded to its
/// portable form.
///
/// Any enumeration or fetch failure aborts the whole pull; no partial
/// payload is returned.
pub fn pull(store: &Store) -> SeedbedResult<CollectionPayload> {
    let names: Vec<String> = store
        .list_collections()?
        .into_iter()
        .filter(|name| namespace::is_data(name))
        .collect();
    log::debug!("Pulling {} collections", names.len());

    let mut fetched: Vec<SeedbedResult<Vec<Document>>> = Vec::with_capacity(names.len());
    for chunk in names.chunks(get_cpu_count().max(1)) {
        let mut chunk_results: Vec<SeedbedResult<Vec<Document>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|name| scope.spawn(move || fetch_collection(store, name)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(SeedbedError::new(
                            "Pull worker thread panicked",
                            ErrorKind::InternalError,
                        ))
                    })
                })
                .collect()
        });
        fetched.append(&mut chunk_results);
    }

    let mut payload = CollectionPayload::new();
    for (name, result) in names.into_iter().zip(fetched) {
        payload.insert(name, result?);
    }
    Ok(payload)
}

fn fetch_collection(store: &Store, name: &str) -> SeedbedResult<Vec<Document>> {
    let codec = ExtendedCodec::new();
    store
        .find_all(name)?
        .map(|document| document.and_then(|doc| codec.encode(&doc)))
        .collect()
}

/// Pulls a whole database into a sink as a single JSON object, streaming.
///
/// The framing is one `"collection": [ ... ]` entry per surviving
/// collection inside one top-level object. Each document is encoded and
/// written as it comes off the cursor, so memory stays bounded by one
/// document rather than the database size. The sink has exactly one
/// writer for the duration of the call.
///
/// On failure the stream is left unterminated and the error returned; a
/// sink whose content does not parse as a complete JSON object must be
/// treated as a failed pull.
pub fn pull_to_sink(store: &Store, sink: &mut dyn Write) -> SeedbedResult<()> {
    let names: Vec<String> = store
        .list_collections()?
        .into_iter()
        .filter(|name| namespace::is_data(name))
        .collect();

    let codec = ExtendedCodec::new();
    sink.write_all(b"{")?;
    for (index, name) in names.iter().enumerate() {
        if index > 0 {
            sink.write_all(b",")?;
        }
        let header = serde_json::to_string(name)?;
        write!(sink, "\n  {}: [", header)?;

        let mut first = true;
        for document in store.find_all(name)? {
            let encoded = codec.encode(&document?)?;
            let tree = format::document_to_json(&encoded)?;
            let rendered = serde_json::to_string(&tree)?;
            if first {
                first = false;
            } else {
                sink.write_all(b",")?;
            }
            write!(sink, "\n    {}", rendered)?;
        }
        if first {
            sink.write_all(b"]")?;
        } else {
            sink.write_all(b"\n  ]")?;
        }
    }
    sink.write_all(b"\n}\n")?;
    sink.flush()?;
    Ok(())
}
