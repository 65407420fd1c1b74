//! Payload files: reading, writing and tree conversions.
//!
//! A payload file is YAML or JSON whose top level maps collection names to
//! document arrays, plus zero or more `$`-prefixed directive keys. The
//! parser never interprets directives or extended-value markers; it only
//! rebuilds the parsed tree as a [Document] with keys kept verbatim. The
//! resolver and the codec give the tree its meaning later.
//!
//! The file format is chosen by extension: `.yml`/`.yaml` or `.json`.
//! Anything else is a [ErrorKind::ConfigurationError], which is also what
//! a `$require` against an unsupported file reports.

use std::fs;
use std::path::Path;

use crate::codec::ExtendedCodec;
use crate::common::{JSON_EXTENSION, YAML_EXTENSIONS};
use crate::document::{CollectionPayload, Document, Value};
use crate::errors::{ErrorKind, SeedbedError, SeedbedResult};

/// Supported payload file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadFormat {
    Yaml,
    Json,
}

impl PayloadFormat {
    /// Determines the format from a file extension.
    pub fn from_path(path: &Path) -> SeedbedResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if YAML_EXTENSIONS.contains(&extension.as_str()) {
            Ok(PayloadFormat::Yaml)
        } else if extension == JSON_EXTENSION {
            Ok(PayloadFormat::Json)
        } else {
            log::error!(
                "Unsupported payload file extension '{}' for {}",
                extension,
                path.display()
            );
            Err(SeedbedError::new(
                &format!(
                    "Unsupported payload file extension '{}' for {} (expected .yml, .yaml or .json)",
                    extension,
                    path.display()
                ),
                ErrorKind::ConfigurationError,
            ))
        }
    }
}

/// Reads and parses a payload file into its raw document tree.
///
/// An empty file yields an empty document.
pub fn read_payload(path: &Path) -> SeedbedResult<Document> {
    let format = PayloadFormat::from_path(path)?;
    let text = fs::read_to_string(path)?;

    let value = match format {
        PayloadFormat::Yaml => {
            let parsed: serde_yaml_ng::Value = serde_yaml_ng::from_str(&text)?;
            yaml_to_value(&parsed)?
        }
        PayloadFormat::Json => {
            let parsed: serde_json::Value = serde_json::from_str(&text)?;
            json_to_value(&parsed)?
        }
    };

    match value {
        Value::Document(doc) => Ok(doc),
        Value::Null => Ok(Document::new()),
        _ => {
            log::error!("Payload top level must be a mapping: {}", path.display());
            Err(SeedbedError::new(
                &format!("Payload top level must be a mapping: {}", path.display()),
                ErrorKind::FormatError,
            ))
        }
    }
}

/// Writes a pulled payload to a file, pretty-printed in the format the
/// file extension selects.
pub fn write_payload(path: &Path, payload: &CollectionPayload) -> SeedbedResult<()> {
    let format = PayloadFormat::from_path(path)?;
    let tree = document_to_json(&payload_to_document(payload))?;

    let text = match format {
        PayloadFormat::Json => {
            let mut rendered = serde_json::to_string_pretty(&tree)?;
            rendered.push('\n');
            rendered
        }
        PayloadFormat::Yaml => serde_yaml_ng::to_string(&tree)?,
    };

    fs::write(path, text)?;
    log::debug!("Wrote payload to {}", path.display());
    Ok(())
}

/// Rebuilds the file-shaped top-level document from a payload.
pub fn payload_to_document(payload: &CollectionPayload) -> Document {
    let mut root = Document::new();
    for (name, documents) in payload {
        let values: Vec<Value> = documents.iter().cloned().map(Value::Document).collect();
        root.insert(name.clone(), Value::Array(values));
    }
    root
}

/// Converts a document tree to a `serde_json` tree, field order preserved.
///
/// Native values are encoded to their portable marker forms on the way
/// out, so the result is always plain JSON.
pub fn document_to_json(document: &Document) -> SeedbedResult<serde_json::Value> {
    let mut map = serde_json::Map::new();
    for (key, value) in document.iter() {
        map.insert(key.clone(), value_to_json(value)?);
    }
    Ok(serde_json::Value::Object(map))
}

/// Converts a single value to a `serde_json` value.
pub fn value_to_json(value: &Value) -> SeedbedResult<serde_json::Value> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(v) => Ok(serde_json::Value::Bool(*v)),
        Value::I64(v) => Ok(serde_json::Value::Number((*v).into())),
        Value::U64(v) => Ok(serde_json::Value::Number((*v).into())),
        Value::F64(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .ok_or_else(|| {
                log::error!("Non-finite float {} cannot be serialized", v);
                SeedbedError::new(
                    &format!("Non-finite float {} cannot be serialized", v),
                    ErrorKind::FormatError,
                )
            }),
        Value::String(v) => Ok(serde_json::Value::String(v.clone())),
        Value::Document(doc) => document_to_json(doc),
        Value::Array(values) => {
            let items: SeedbedResult<Vec<serde_json::Value>> =
                values.iter().map(value_to_json).collect();
            Ok(serde_json::Value::Array(items?))
        }
        // native values leave as their portable marker forms
        native => {
            let encoded = ExtendedCodec::new().encode_value(native)?;
            value_to_json(&encoded)
        }
    }
}

/// Converts a `serde_json` tree to a value, keys kept verbatim.
pub fn json_to_value(value: &serde_json::Value) -> SeedbedResult<Value> {
    match value {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(v) => Ok(Value::Bool(*v)),
        serde_json::Value::Number(number) => {
            if let Some(v) = number.as_i64() {
                Ok(Value::I64(v))
            } else if let Some(v) = number.as_u64() {
                Ok(Value::U64(v))
            } else if let Some(v) = number.as_f64() {
                Ok(Value::F64(v))
            } else {
                log::error!("Unrepresentable JSON number {}", number);
                Err(SeedbedError::new(
                    &format!("Unrepresentable JSON number {}", number),
                    ErrorKind::FormatError,
                ))
            }
        }
        serde_json::Value::String(v) => Ok(Value::String(v.clone())),
        serde_json::Value::Array(items) => {
            let values: SeedbedResult<Vec<Value>> = items.iter().map(json_to_value).collect();
            Ok(Value::Array(values?))
        }
        serde_json::Value::Object(map) => {
            let mut doc = Document::new();
            for (key, item) in map {
                doc.insert(key.clone(), json_to_value(item)?);
            }
            Ok(Value::Document(doc))
        }
    }
}

/// Converts a `serde_yaml_ng` tree to a value, keys kept verbatim.
///
/// Mapping keys must be scalars; booleans and numbers used as keys are
/// stringified the way the original text spelled them.
pub fn yaml_to_value(value: &serde_yaml_ng::Value) -> SeedbedResult<Value> {
    match value {
        serde_yaml_ng::Value::Null => Ok(Value::Null),
        serde_yaml_ng::Value::Bool(v) => Ok(Value::Bool(*v)),
        serde_yaml_ng::Value::Number(number) => {
            if let Some(v) = number.as_i64() {
                Ok(Value::I64(v))
            } else if let Some(v) = number.as_u64() {
                Ok(Value::U64(v))
            } else if let Some(v) = number.as_f64() {
                Ok(Value::F64(v))
            } else {
                log::error!("Unrepresentable YAML number {:?}", number);
                Err(SeedbedError::new(
                    &format!("Unrepresentable YAML number {:?}", number),
                    ErrorKind::FormatError,
                ))
            }
        }
        serde_yaml_ng::Value::String(v) => Ok(Value::String(v.clone())),
        serde_yaml_ng::Value::Sequence(items) => {
            let values: SeedbedResult<Vec<Value>> = items.iter().map(yaml_to_value).collect();
            Ok(Value::Array(values?))
        }
        serde_yaml_ng::Value::Mapping(mapping) => {
            let mut doc = Document::new();
            for (key, item) in mapping {
                let key = yaml_key_to_string(key)?;
                doc.insert(key, yaml_to_value(item)?);
            }
            Ok(Value::Document(doc))
        }
        serde_yaml_ng::Value::Tagged(tagged) => yaml_to_value(&tagged.value),
    }
}

fn yaml_key_to_string(key: &serde_yaml_ng::Value) -> SeedbedResult<String> {
    match key {
        serde_yaml_ng::Value::String(v) => Ok(v.clone()),
        serde_yaml_ng::Value::Bool(v) => Ok(v.to_string()),
        serde_yaml_ng::Value::Number(v) => Ok(v.to_string()),
        other => {
            log::error!("Unsupported YAML mapping key: {:?}", other);
            Err(SeedbedError::new(
                &format!("Unsupported YAML mapping key: {:?}", other),
                ErrorKind::FormatError,
            ))
        }
    }
}
