use indexmap::IndexMap;

use crate::document::Document;

/// The resolved, directive-free payload exchanged with a store: an ordered
/// mapping from collection name to that collection's documents.
///
/// Built fresh per push/pull call. On push it is the output of the
/// directive resolver; on pull every document has already been encoded to
/// its portable form.
pub type CollectionPayload = IndexMap<String, Vec<Document>>;

/// Total number of documents across all collections of a payload.
pub fn document_count(payload: &CollectionPayload) -> usize {
    payload.values().map(Vec::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_document_count() {
        let mut payload = CollectionPayload::new();
        payload.insert("people".to_string(), vec![doc! { a: 1 }, doc! { a: 2 }]);
        payload.insert("bands".to_string(), vec![doc! { b: 1 }]);
        payload.insert("empty".to_string(), vec![]);
        assert_eq!(document_count(&payload), 3);
    }
}
