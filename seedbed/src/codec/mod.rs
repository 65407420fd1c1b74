//! Extended-value codec between portable marker forms and native types.
//!
//! Payload files are plain YAML/JSON and cannot carry document identifiers,
//! timestamps, binary blobs or regular expressions directly; those travel
//! as single-purpose marker documents:
//!
//! | native                | portable                                      |
//! |-----------------------|-----------------------------------------------|
//! | [Value::Id]           | `{"$oid": "<24 hex>"}`                        |
//! | [Value::DateTime]     | `{"$date": "<RFC 3339, millisecond UTC>"}`    |
//! | [Value::Bytes]        | `{"$binary": "<base64>"}`                     |
//! | [Value::Regex]        | `{"$regex": "<pattern>", "$options": "<f>"}`  |
//!
//! [ExtendedCodec::decode] also accepts `{"$date": <millis since epoch>}`.
//!
//! Both directions are pure tree transformations with no I/O, and they
//! round-trip: `decode(encode(d)) == d` for any document built from
//! supported types. Timestamps are carried at millisecond precision.
//!
//! Marker documents with an unrecognized `$`-key pass through unchanged in
//! the default mode, so pulling a database never fails on a type this crate
//! does not know; [ExtendedCodec::strict] turns them into a
//! [ErrorKind::CodecError] instead. A *recognized* marker with a malformed
//! payload (bad hex, bad base64, unparseable timestamp, invalid regex
//! pattern) is an error in both modes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::common::{
    BINARY_MARKER, DATE_MARKER, DIRECTIVE_SIGIL, OID_MARKER, REGEX_MARKER, REGEX_OPTIONS_MARKER,
};
use crate::document::{Document, DocumentId, Value};
use crate::errors::{ErrorKind, SeedbedError, SeedbedResult};

/// Codec converting documents between native and portable form.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtendedCodec {
    strict: bool,
}

impl ExtendedCodec {
    /// Creates a codec in the default lenient mode: unrecognized marker
    /// documents pass through unchanged.
    pub fn new() -> Self {
        ExtendedCodec { strict: false }
    }

    /// Creates a codec that rejects unrecognized `$`-marker documents with
    /// a [ErrorKind::CodecError].
    pub fn strict() -> Self {
        ExtendedCodec { strict: true }
    }

    /// Converts a native document to its portable form.
    pub fn encode(&self, document: &Document) -> SeedbedResult<Document> {
        let mut encoded = Document::new();
        for (key, value) in document.iter() {
            encoded.insert(key.clone(), self.encode_value(value)?);
        }
        Ok(encoded)
    }

    /// Converts a portable document to its native form, resolving marker
    /// documents into native values.
    pub fn decode(&self, document: &Document) -> SeedbedResult<Document> {
        let mut decoded = Document::new();
        for (key, value) in document.iter() {
            decoded.insert(key.clone(), self.decode_value(value)?);
        }
        Ok(decoded)
    }

    pub(crate) fn encode_value(&self, value: &Value) -> SeedbedResult<Value> {
        match value {
            Value::Id(id) => {
                let mut marker = Document::new();
                marker.insert(OID_MARKER, id.to_hex());
                Ok(Value::Document(marker))
            }
            Value::DateTime(ts) => {
                let mut marker = Document::new();
                marker.insert(
                    DATE_MARKER,
                    ts.to_rfc3339_opts(SecondsFormat::Millis, true),
                );
                Ok(Value::Document(marker))
            }
            Value::Bytes(bytes) => {
                let mut marker = Document::new();
                marker.insert(BINARY_MARKER, BASE64.encode(bytes));
                Ok(Value::Document(marker))
            }
            Value::Regex { pattern, options } => {
                let mut marker = Document::new();
                marker.insert(REGEX_MARKER, pattern.clone());
                if !options.is_empty() {
                    marker.insert(REGEX_OPTIONS_MARKER, options.clone());
                }
                Ok(Value::Document(marker))
            }
            Value::Document(doc) => Ok(Value::Document(self.encode(doc)?)),
            Value::Array(values) => {
                let encoded: SeedbedResult<Vec<Value>> =
                    values.iter().map(|v| self.encode_value(v)).collect();
                Ok(Value::Array(encoded?))
            }
            other => Ok(other.clone()),
        }
    }

    pub(crate) fn decode_value(&self, value: &Value) -> SeedbedResult<Value> {
        match value {
            Value::Document(doc) => self.decode_document_value(doc),
            Value::Array(values) => {
                let decoded: SeedbedResult<Vec<Value>> =
                    values.iter().map(|v| self.decode_value(v)).collect();
                Ok(Value::Array(decoded?))
            }
            other => Ok(other.clone()),
        }
    }

    fn decode_document_value(&self, doc: &Document) -> SeedbedResult<Value> {
        if doc.size() == 1 {
            if let Some(value) = doc.get_field(OID_MARKER) {
                return decode_oid(value);
            }
            if let Some(value) = doc.get_field(DATE_MARKER) {
                return decode_date(value);
            }
            if let Some(value) = doc.get_field(BINARY_MARKER) {
                return decode_binary(value);
            }
        }
        if doc.contains_key(REGEX_MARKER)
            && doc
                .keys()
                .all(|k| k == REGEX_MARKER || k == REGEX_OPTIONS_MARKER)
        {
            return self.decode_regex(doc);
        }

        if self.strict {
            if let Some(key) = doc.keys().find(|k| k.starts_with(DIRECTIVE_SIGIL)) {
                log::error!("Unrecognized extended value marker '{}'", key);
                return Err(SeedbedError::new(
                    &format!("Unrecognized extended value marker '{}'", key),
                    ErrorKind::CodecError,
                ));
            }
        }

        Ok(Value::Document(self.decode(doc)?))
    }

    fn decode_regex(&self, doc: &Document) -> SeedbedResult<Value> {
        let pattern = match doc.get_field(REGEX_MARKER) {
            Some(Value::String(pattern)) => pattern.clone(),
            _ => {
                log::error!("$regex marker must hold a string pattern");
                return Err(SeedbedError::new(
                    "$regex marker must hold a string pattern",
                    ErrorKind::CodecError,
                ));
            }
        };
        let options = match doc.get_field(REGEX_OPTIONS_MARKER) {
            Some(Value::String(options)) => options.clone(),
            None => String::new(),
            _ => {
                log::error!("$options marker must hold a string");
                return Err(SeedbedError::new(
                    "$options marker must hold a string",
                    ErrorKind::CodecError,
                ));
            }
        };

        if self.strict {
            regex::Regex::new(&pattern).map_err(|err| {
                log::error!("Invalid $regex pattern: {}", err);
                SeedbedError::new(
                    &format!("Invalid $regex pattern: {}", err),
                    ErrorKind::CodecError,
                )
            })?;
        }

        Ok(Value::Regex { pattern, options })
    }
}

fn decode_oid(value: &Value) -> SeedbedResult<Value> {
    match value {
        Value::String(hex_str) => {
            let id = DocumentId::from_hex(hex_str).map_err(|err| {
                SeedbedError::new_with_cause(
                    &format!("Invalid $oid value '{}'", hex_str),
                    ErrorKind::CodecError,
                    err,
                )
            })?;
            Ok(Value::Id(id))
        }
        _ => {
            log::error!("$oid marker must hold a hex string");
            Err(SeedbedError::new(
                "$oid marker must hold a hex string",
                ErrorKind::CodecError,
            ))
        }
    }
}

fn decode_date(value: &Value) -> SeedbedResult<Value> {
    match value {
        Value::String(text) => {
            let parsed = DateTime::parse_from_rfc3339(text).map_err(|err| {
                log::error!("Invalid $date value '{}': {}", text, err);
                SeedbedError::new(
                    &format!("Invalid $date value '{}': {}", text, err),
                    ErrorKind::CodecError,
                )
            })?;
            Ok(Value::DateTime(parsed.with_timezone(&Utc)))
        }
        Value::I64(millis) => decode_millis(*millis),
        Value::U64(millis) => {
            let millis = i64::try_from(*millis).map_err(|_| {
                SeedbedError::new(
                    &format!("$date value {} out of range", millis),
                    ErrorKind::CodecError,
                )
            })?;
            decode_millis(millis)
        }
        _ => {
            log::error!("$date marker must hold a timestamp string or milliseconds");
            Err(SeedbedError::new(
                "$date marker must hold a timestamp string or milliseconds",
                ErrorKind::CodecError,
            ))
        }
    }
}

fn decode_millis(millis: i64) -> SeedbedResult<Value> {
    match Utc.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(ts) => Ok(Value::DateTime(ts)),
        _ => {
            log::error!("$date value {} out of range", millis);
            Err(SeedbedError::new(
                &format!("$date value {} out of range", millis),
                ErrorKind::CodecError,
            ))
        }
    }
}

fn decode_binary(value: &Value) -> SeedbedResult<Value> {
    match value {
        Value::String(text) => {
            let bytes = BASE64.decode(text).map_err(|err| {
                log::error!("Invalid $binary value: {}", err);
                SeedbedError::new(
                    &format!("Invalid $binary value: {}", err),
                    ErrorKind::CodecError,
                )
            })?;
            Ok(Value::Bytes(bytes))
        }
        _ => {
            log::error!("$binary marker must hold a base64 string");
            Err(SeedbedError::new(
                "$binary marker must hold a base64 string",
                ErrorKind::CodecError,
            ))
        }
    }
}
