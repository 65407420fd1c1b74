//! Documents, values and identifiers.
//!
//! A [Document] is an insertion-ordered map from string keys to [Value]s,
//! with support for embedded field paths (`"location.address.zip"`). The
//! [doc!](crate::doc) macro builds documents with JSON-like syntax:
//!
//! ```rust,ignore
//! use seedbed::doc;
//!
//! let doc = doc! {
//!     name: "Alice",
//!     address: { city: "New York" },
//!     tags: ["admin"],
//! };
//! ```
//!
//! [DocumentId] is the generated identifier a store assigns to documents
//! inserted without an `_id` field; its portable form is the `$oid` hex
//! marker understood by the extended-value codec.

#[allow(clippy::module_inception)]
mod document;
mod document_id;
mod payload;
mod value;

pub use document::*;
pub use document_id::*;
pub use payload::*;
pub use value::*;

pub(crate) use document_id::IdGenerator;
