//! Collection name classification.
//!
//! A document store keeps housekeeping collections alongside user data:
//! `system.*` catalogs, operation logs, and reserved names carrying a `$`.
//! Pull must not emit those, so every enumerated name passes through
//! [is_data] first. Push never consults the filter; it only ever targets
//! names explicitly present in a payload.

use crate::common::{OPLOG_MAIN, OPLOG_PREFIX, OPLOG_REPLSET, SYSTEM_PREFIX};

/// Classification of a collection name under the store naming convention.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    name: String,
    system: bool,
    oplog: bool,
    special: bool,
}

impl Namespace {
    /// Parses a collection name into its classification flags.
    pub fn parse(name: &str) -> Self {
        let system = name.starts_with(SYSTEM_PREFIX) || name.contains(".system.");
        let oplog =
            name == OPLOG_MAIN || name == OPLOG_REPLSET || name.starts_with(OPLOG_PREFIX);
        let special = name.contains('$');
        Namespace {
            name: name.to_string(),
            system,
            oplog,
            special,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for internal system catalogs such as `system.indexes`.
    pub fn is_system(&self) -> bool {
        self.system
    }

    /// True for operation log collections.
    pub fn is_oplog(&self) -> bool {
        self.oplog
    }

    /// True for reserved names carrying a `$`.
    pub fn is_special(&self) -> bool {
        self.special
    }

    /// True when the name is an ordinary, user-visible data collection.
    pub fn is_data(&self) -> bool {
        !self.name.is_empty() && !self.system && !self.oplog && !self.special
    }
}

/// Shorthand for `Namespace::parse(name).is_data()`.
pub fn is_data(name: &str) -> bool {
    Namespace::parse(name).is_data()
}
