use crate::errors::{ErrorKind, SeedbedError, SeedbedResult};
use crate::ID_GENERATOR;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use std::fmt::{Debug, Display};
use std::sync::atomic::{AtomicU32, Ordering};

/// Number of raw bytes in a [DocumentId].
pub const ID_LENGTH: usize = 12;

/// Number of hex characters in the textual form of a [DocumentId].
pub const ID_HEX_LENGTH: usize = ID_LENGTH * 2;

static ID_LENGTH_ERROR: Lazy<SeedbedError> = Lazy::new(|| {
    SeedbedError::new(
        &format!(
            "DocumentId validation error: id must be exactly {} hex characters",
            ID_HEX_LENGTH
        ),
        ErrorKind::InvalidId,
    )
});

/// A unique identifier for documents.
///
/// Twelve bytes: a 4-byte big-endian seconds timestamp, 5 process-unique
/// random bytes and a 3-byte incrementing counter. The textual form is the
/// 24-character lowercase hex rendering, which is also how identifiers
/// travel through the extended-value codec (`{"$oid": "..."}`).
///
/// Ids generated in one process are unique and roughly timestamp-ordered.
/// A document without an `_id` field receives a generated id during
/// insertion; documents may also carry any other value as `_id` (a string
/// key, a number), in which case no id is generated.
///
/// # Examples
///
/// ```rust,ignore
/// use seedbed::document::DocumentId;
///
/// let id = DocumentId::new();
/// assert_eq!(id.to_hex().len(), 24);
///
/// let parsed = DocumentId::from_hex("561d87b8b260cf35147998ca")?;
/// assert_eq!(parsed.to_hex(), "561d87b8b260cf35147998ca");
/// ```
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy)]
pub struct DocumentId {
    bytes: [u8; ID_LENGTH],
}

impl DocumentId {
    /// Generates a new unique `DocumentId` from the process-global generator.
    pub fn new() -> Self {
        ID_GENERATOR.next_id()
    }

    /// Creates a `DocumentId` from raw bytes.
    pub fn from_bytes(bytes: [u8; ID_LENGTH]) -> Self {
        DocumentId { bytes }
    }

    /// Parses a `DocumentId` from its 24-character hex form.
    ///
    /// # Errors
    ///
    /// Returns an [ErrorKind::InvalidId] error when the input is not
    /// exactly 24 hex characters.
    pub fn from_hex(hex_str: &str) -> SeedbedResult<Self> {
        if hex_str.len() != ID_HEX_LENGTH {
            log::error!("Document id must be {} hex characters", ID_HEX_LENGTH);
            return Err(ID_LENGTH_ERROR.clone());
        }

        let decoded = hex::decode(hex_str).map_err(|err| {
            log::error!("Document id is not valid hex: {}", err);
            SeedbedError::new(
                &format!("Document id is not valid hex: {}", err),
                ErrorKind::InvalidId,
            )
        })?;

        let mut bytes = [0u8; ID_LENGTH];
        bytes.copy_from_slice(&decoded);
        Ok(DocumentId { bytes })
    }

    /// Returns the 24-character lowercase hex form of this id.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Returns the raw bytes of this id.
    pub fn bytes(&self) -> &[u8; ID_LENGTH] {
        &self.bytes
    }

    /// Returns the creation timestamp embedded in this id, at second
    /// precision.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let seconds = u32::from_be_bytes([
            self.bytes[0],
            self.bytes[1],
            self.bytes[2],
            self.bytes[3],
        ]);
        match Utc.timestamp_opt(i64::from(seconds), 0) {
            chrono::LocalResult::Single(ts) => ts,
            _ => Utc.timestamp_opt(0, 0).earliest().unwrap_or_default(),
        }
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        DocumentId::new()
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentId({})", self.to_hex())
    }
}

/// Process-global generator backing [DocumentId::new].
///
/// The 5 random bytes are drawn once per process; the counter starts at a
/// random offset and wraps within 3 bytes, so ids within one second remain
/// distinct.
pub(crate) struct IdGenerator {
    process_unique: [u8; 5],
    counter: AtomicU32,
}

impl IdGenerator {
    pub(crate) fn new() -> Self {
        let mut rng = rand::thread_rng();
        IdGenerator {
            process_unique: rng.gen::<[u8; 5]>(),
            counter: AtomicU32::new(rng.gen::<u32>() & 0x00FF_FFFF),
        }
    }

    pub(crate) fn next_id(&self) -> DocumentId {
        let seconds = Utc::now().timestamp().clamp(0, i64::from(u32::MAX)) as u32;
        let count = self.counter.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;

        let mut bytes = [0u8; ID_LENGTH];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&self.process_unique);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
        DocumentId { bytes }
    }
}
