//! The push and pull transfer pipelines.
//!
//! [push] moves a raw payload tree into a store: optional database drop,
//! directive resolution, codec decoding, batched insertion. [pull] moves a
//! whole database the other way, namespace-filtered and codec-encoded;
//! [pull_to_sink] is the streaming variant that writes JSON as documents
//! come off each cursor instead of buffering the database. [copy]
//! transfers a whole database between two stores directly.

mod copy;
mod pull;
mod push;

pub use copy::*;
pub use pull::*;
pub use push::*;
