use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::common::{DOC_ID, FIELD_SEPARATOR};
use crate::document::{DocumentId, Value};
use crate::errors::{ErrorKind, SeedbedError, SeedbedResult};
use std::fmt::{Debug, Display};

type PathVec<'a> = SmallVec<[&'a str; 8]>;

/// An ordered mapping from string keys to [Value]s.
///
/// Documents preserve insertion order, which is the author's field order in
/// a payload file; a push/pull round trip must not reshuffle fields, so the
/// backing map is insertion-ordered rather than key-sorted.
///
/// Keys passed to [Document::put] and [Document::get] may be embedded field
/// paths separated by `.`: `doc.put("location.address.zip", 10001)` creates
/// the intermediate documents as needed, and
/// `doc.get("location.address.zip")` walks into them. Array elements are
/// addressed by numeric segments (`"items.0"`). The raw accessors
/// [Document::insert], [Document::get_field] and [Document::remove] treat
/// the key verbatim, which is what parsers and the codec use so that keys
/// like `"$oid"` or keys containing dots survive untouched.
#[derive(Clone, Eq, PartialEq, Default)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    /// Checks if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of top-level entries in the document.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Inserts a key-value pair without interpreting the key as a field
    /// path. An existing value under the same key is replaced.
    ///
    /// This is the accessor used when faithfully rebuilding parsed trees;
    /// keys containing `.` or `$` are stored verbatim.
    pub fn insert<T: Into<Value>>(&mut self, key: impl Into<String>, value: T) {
        self.data.insert(key.into(), value.into());
    }

    /// Returns a reference to the value stored under the verbatim key, if
    /// present.
    pub fn get_field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Associates the specified [Value] with the specified key.
    ///
    /// The key may be an embedded field path (`"user.address.zip"`): path
    /// segments address nested documents and missing intermediate segments
    /// are created as documents. Use [Document::insert] to store a key
    /// verbatim instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or contains an empty path
    /// segment.
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> SeedbedResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(SeedbedError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        let value = value.into();
        if key.contains(FIELD_SEPARATOR) {
            let splits: PathVec = key.split(FIELD_SEPARATOR).collect();
            self.deep_put(&splits, value)
        } else {
            self.data.insert(key.to_string(), value);
            Ok(())
        }
    }

    /// Returns the [Value] stored under the given key, or [Value::Null] if
    /// the document contains no mapping for it.
    ///
    /// The key may be an embedded field path; numeric segments index into
    /// arrays.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty path segment or an out-of-range array
    /// index.
    pub fn get(&self, key: &str) -> SeedbedResult<Value> {
        match self.data.get(key) {
            Some(value) => Ok(value.clone()),
            None => {
                // Only walk the path if the key was not found verbatim
                if key.contains(FIELD_SEPARATOR) {
                    let splits: PathVec = key.split(FIELD_SEPARATOR).collect();
                    let first = splits[0];
                    if first.is_empty() {
                        log::error!("Document does not support empty key");
                        return Err(SeedbedError::new(
                            "Document does not support empty key",
                            ErrorKind::InvalidOperation,
                        ));
                    }
                    self.recursive_get(self.data.get(first), &splits[1..])
                } else {
                    Ok(Value::Null)
                }
            }
        }
    }

    /// Removes and returns the value stored under the verbatim key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    /// Checks if a top-level key exists in the document.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the id stored under `_id`, generating and storing a fresh
    /// [DocumentId] when the field is absent.
    ///
    /// Documents may carry any value as `_id` (a string, a number); an
    /// existing value of whatever type is returned unchanged.
    pub fn ensure_id(&mut self) -> Value {
        if let Some(value) = self.data.get(DOC_ID) {
            value.clone()
        } else {
            let id = Value::Id(DocumentId::new());
            self.data.insert(DOC_ID.to_string(), id.clone());
            id
        }
    }

    /// Checks if this document has an `_id` field.
    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    /// Merges another document into this one.
    ///
    /// If a key exists in both and both values are documents they are
    /// merged recursively; otherwise the value from `other` replaces the
    /// existing one.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            match (self.data.get_mut(key), value) {
                (Some(Value::Document(existing)), Value::Document(incoming)) => {
                    existing.merge(incoming);
                }
                _ => {
                    self.data.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Iterates over the top-level key-value pairs in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.data.iter()
    }

    /// Iterates over the top-level keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.data.keys()
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> SeedbedResult<()> {
        let key = splits[0];
        if key.is_empty() {
            log::error!("Document does not support empty path segment");
            return Err(SeedbedError::new(
                "Document does not support empty path segment",
                ErrorKind::InvalidOperation,
            ));
        }

        if splits.len() == 1 {
            // last segment, store in the current document
            self.data.insert(key.to_string(), value);
            Ok(())
        } else {
            let remaining = &splits[1..];
            if let Some(Value::Document(nested)) = self.data.get_mut(key) {
                // current level is already an embedded document, descend
                nested.deep_put(remaining, value)
            } else {
                // missing or non-document, create the intermediate document
                let mut nested = Document::new();
                nested.deep_put(remaining, value)?;
                self.data.insert(key.to_string(), Value::Document(nested));
                Ok(())
            }
        }
    }

    fn recursive_get(&self, value: Option<&Value>, splits: &[&str]) -> SeedbedResult<Value> {
        let value = match value {
            None => return Ok(Value::Null),
            Some(v) => v,
        };

        if splits.is_empty() {
            return Ok(value.clone());
        }

        let key = splits[0];
        if key.is_empty() {
            log::error!("Document does not support empty path segment");
            return Err(SeedbedError::new(
                "Document does not support empty path segment",
                ErrorKind::InvalidOperation,
            ));
        }

        match value {
            Value::Document(doc) => doc.recursive_get(doc.data.get(key), &splits[1..]),
            Value::Array(arr) => {
                let index = key.parse::<isize>().map_err(|_| {
                    log::error!("Invalid array index {} inside a document", key);
                    SeedbedError::new(
                        &format!("Invalid array index {} inside a document", key),
                        ErrorKind::InvalidOperation,
                    )
                })?;

                if index < 0 {
                    log::error!("Invalid array index {} inside a document", index);
                    return Err(SeedbedError::new(
                        &format!("Invalid array index {} inside a document", index),
                        ErrorKind::InvalidOperation,
                    ));
                }

                let index = index as usize;
                if index >= arr.len() {
                    log::error!("Array index {} out of bound", index);
                    return Err(SeedbedError::new(
                        &format!("Array index {} out of bound", index),
                        ErrorKind::InvalidOperation,
                    ));
                }

                self.recursive_get(Some(&arr[index]), &splits[1..])
            }
            _ => Ok(Value::Null),
        }
    }

    pub(crate) fn to_pretty_json(&self, indent: usize) -> String {
        if self.data.is_empty() {
            return "{}".to_string();
        }

        let mut json_string = String::new();
        json_string.push_str("{\n");
        let indent_str = " ".repeat(indent + 2);
        let entries: Vec<String> = self
            .data
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}\"{}\": {}",
                    indent_str,
                    key,
                    value.to_pretty_json(indent + 2)
                )
            })
            .collect();
        json_string.push_str(&entries.join(",\n"));
        json_string.push_str(&format!("\n{}}}", " ".repeat(indent)));
        json_string
    }

    pub(crate) fn to_debug_string(&self, indent: usize) -> String {
        if self.data.is_empty() {
            return "{}".to_string();
        }

        let mut debug_string = String::new();
        debug_string.push_str("{\n");
        let indent_str = " ".repeat(indent + 2);
        let entries: Vec<String> = self
            .data
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}\"{}\": {}",
                    indent_str,
                    key,
                    value.to_debug_string(indent + 2)
                )
            })
            .collect();
        debug_string.push_str(&entries.join(",\n"));
        debug_string.push_str(&format!("\n{}}}", " ".repeat(indent)));
        debug_string
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_debug_string(0))
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_pretty_json(0))
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// # Examples
///
/// ```rust
/// use seedbed::doc;
///
/// // Empty document
/// let empty = doc! {};
///
/// // Simple key-value pairs
/// let simple = doc! {
///     name: "Alice",
///     age: 30
/// };
///
/// // Nested documents and arrays
/// let complex = doc! {
///     user: {
///         name: "Charlie",
///         tags: ["admin", "user"]
///     },
///     values: [1, 2, 3]
/// };
/// ```
#[macro_export]
macro_rules! doc {
    // match an empty document
    () => {
        $crate::document::Document::new()
    };

    // match a document with key value pairs
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::document::Document::new();
            $(
                doc.insert(
                    $crate::document::normalize(stringify!($key)),
                    $crate::doc_value!($value),
                );
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the [doc!] macro.
/// Handles nested documents, arrays, and expressions.
#[macro_export]
macro_rules! doc_value {
    // match a nested document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::document::Value::Document($crate::doc!{ $($key : $value),* })
    };

    // match an array of values
    ([ $($value:tt),* $(,)? ]) => {
        $crate::document::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    // match an expression (variable, literal, parenthesized arithmetic)
    ($value:expr) => {
        $crate::document::Value::from($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Value::Null;

    fn set_up() -> Document {
        doc! {
            score: 1034,
            location: {
                state: "NY",
                city: "New York",
                address: {
                    line1: "40",
                    line2: "ABC Street",
                    house: ["1", "2", "3"],
                    zip: 10001,
                },
            },
            category: ["food", "produce", "grocery"],
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("\"ABC\""), "ABC");
        assert_eq!(normalize("ABC"), "ABC");
    }

    #[test]
    fn test_new_is_empty() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.size(), 0);
    }

    #[test]
    fn test_get() {
        let doc = set_up();
        assert_eq!(doc.get("score").unwrap(), Value::I64(1034));
        assert_eq!(doc.get("location.state").unwrap(), Value::from("NY"));
        assert_eq!(doc.get("location.address.line1").unwrap(), Value::from("40"));
        assert_eq!(doc.get("location.address.zip").unwrap(), Value::I64(10001));
        assert_eq!(doc.get("category.0").unwrap(), Value::from("food"));
        assert_eq!(doc.get("category.2").unwrap(), Value::from("grocery"));
        assert_eq!(doc.get("missing").unwrap(), Null);
        assert_eq!(doc.get("location.address.test").unwrap(), Null);
        assert_eq!(doc.get("score.test").unwrap(), Null);
    }

    #[test]
    fn test_get_invalid_array_index() {
        let doc = set_up();
        assert!(doc.get("category.3").is_err());
        assert!(doc.get("category.-1").is_err());
        assert!(doc.get("category.x").is_err());
    }

    #[test]
    fn test_get_empty_segment() {
        let doc = set_up();
        assert!(doc.get(".").is_err());
        assert!(doc.get("..").is_err());
    }

    #[test]
    fn test_put_and_get() {
        let mut doc = Document::new();
        doc.put("key", 1).unwrap();
        assert_eq!(doc.get("key").unwrap(), Value::I64(1));
    }

    #[test]
    fn test_put_empty_key() {
        let mut doc = Document::new();
        assert!(doc.put("", 1).is_err());
    }

    #[test]
    fn test_put_null() {
        let mut doc = Document::new();
        doc.put("key", Null).unwrap();
        assert_eq!(doc.size(), 1);
        assert_eq!(doc.get("key").unwrap(), Null);
    }

    #[test]
    fn test_deep_put_creates_intermediate_documents() {
        let mut doc = set_up();
        doc.put("location.address.pin", 700037).unwrap();
        assert_eq!(doc.get("location.address.pin").unwrap(), Value::I64(700037));

        doc.put("location.address.business.pin", 700037).unwrap();
        assert_eq!(
            doc.get("location.address.business.pin").unwrap(),
            Value::I64(700037)
        );

        // existing sibling fields survive
        assert_eq!(doc.get("location.address.zip").unwrap(), Value::I64(10001));
    }

    #[test]
    fn test_deep_put_invalid_field() {
        let mut doc = Document::new();
        assert!(doc.put("..invalid..field", 1).is_err());
    }

    #[test]
    fn test_insert_keeps_key_verbatim() {
        let mut doc = Document::new();
        doc.insert("a.b", 5);
        assert!(doc.contains_key("a.b"));
        assert_eq!(doc.get_field("a.b"), Some(&Value::I64(5)));
        // put would have nested instead
        assert_eq!(doc.get_field("a"), None);
    }

    #[test]
    fn test_insert_dollar_keys() {
        let mut doc = Document::new();
        doc.insert("$oid", "561d87b8b260cf35147998ca");
        assert_eq!(
            doc.get_field("$oid"),
            Some(&Value::from("561d87b8b260cf35147998ca"))
        );
    }

    #[test]
    fn test_remove() {
        let mut doc = Document::new();
        doc.put("key", 1).unwrap();
        assert_eq!(doc.remove("key"), Some(Value::I64(1)));
        assert_eq!(doc.size(), 0);
        assert_eq!(doc.remove("missing"), None);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut doc = doc! { a: 1, b: 2, c: 3 };
        doc.remove("b");
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_contains_key() {
        let doc = set_up();
        assert!(doc.contains_key("score"));
        assert!(!doc.contains_key("non_existent"));
        // embedded paths are not top-level keys
        assert!(!doc.contains_key("location.state"));
    }

    #[test]
    fn test_ensure_id_generates_when_absent() {
        let mut doc = doc! { name: "Alice" };
        assert!(!doc.has_id());
        let id = doc.ensure_id();
        assert!(doc.has_id());
        assert!(matches!(id, Value::Id(_)));
        // second call returns the same id
        assert_eq!(doc.ensure_id(), id);
    }

    #[test]
    fn test_ensure_id_keeps_custom_id() {
        let mut doc = doc! { "_id": "Axl Rose", name: "Axl" };
        let id = doc.ensure_id();
        assert_eq!(id, Value::from("Axl Rose"));
    }

    #[test]
    fn test_merge_documents() {
        let mut doc1 = doc! {
            key1: "value1",
            nested: {
                key2: "value2",
            },
        };
        let doc2 = doc! {
            key3: "value3",
            nested: {
                key4: "value4",
            },
        };

        doc1.merge(&doc2);
        assert_eq!(doc1.size(), 3);
        assert_eq!(doc1.get("key1").unwrap(), Value::from("value1"));
        assert_eq!(doc1.get("key3").unwrap(), Value::from("value3"));
        assert_eq!(doc1.get("nested.key2").unwrap(), Value::from("value2"));
        assert_eq!(doc1.get("nested.key4").unwrap(), Value::from("value4"));
    }

    #[test]
    fn test_merge_overwrites_scalars() {
        let mut doc1 = doc! { a: 1 };
        let doc2 = doc! { a: 2 };
        doc1.merge(&doc2);
        assert_eq!(doc1.get("a").unwrap(), Value::I64(2));
    }

    #[test]
    fn test_iteration_order_is_insertion_order() {
        let doc = doc! { z: 1, a: 2, m: 3 };
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_nested_array_of_documents() {
        let doc = doc! {
            obj_array: [
                { value: 1 },
                { value: 2 },
            ]
        };
        assert_eq!(doc.get("obj_array.0.value").unwrap(), Value::I64(1));
        assert_eq!(doc.get("obj_array.1.value").unwrap(), Value::I64(2));
    }

    #[test]
    fn test_display() {
        let doc = doc! {
            key1: "value1",
            key2: 2,
        };
        let display = format!("{}", doc);
        assert!(display.contains("\"key1\": \"value1\""));
        assert!(display.contains("\"key2\": 2"));
    }

    #[test]
    fn test_debug() {
        let doc = doc! {
            key1: "value1",
            key2: 2,
        };
        let debug = format!("{:?}", doc);
        assert!(debug.contains("\"key1\": string(\"value1\")"));
        assert!(debug.contains("\"key2\": i64(2)"));
    }

    #[test]
    fn test_equality() {
        let doc1 = doc! { a: 1, b: { c: 2 } };
        let doc2 = doc! { a: 1, b: { c: 2 } };
        assert_eq!(doc1, doc2);

        let doc3 = doc! { a: 1, b: { c: 3 } };
        assert_ne!(doc1, doc3);
    }
}
