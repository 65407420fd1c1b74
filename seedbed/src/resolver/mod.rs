//! Directive expansion.
//!
//! A raw payload tree may carry four authoring-time directives:
//!
//! - `$require: <relative-path>` (top level only) merges another payload
//!   file in before anything else. Required documents seed the base of a
//!   collection; locally declared documents follow them.
//! - `$<name>: { ... }` top-level keys define extension templates;
//!   `$extend: "$<name>"` inside a document copies every template field the
//!   document does not already define.
//! - `{ "$eval": "<expression>" }` is replaced by the expression's value.
//!   Expressions see a read-only snapshot of the enclosing document's
//!   resolved fields: every plain field (template-inherited ones included)
//!   and the results of `$eval`s that appear earlier in the document.
//! - `$set: { "<dotted.path>": value }` assigns into the enclosing
//!   document after extension and evaluation, creating intermediate
//!   documents along the path.
//!
//! Expansion is a pure tree transformation: the input tree and the
//! extension table are never mutated, and every produced document is an
//! independent copy. All directive keys are gone from the output. Any
//! failure aborts the whole expansion, so a push never partially applies
//! directives.

mod eval;

pub use eval::evaluate;

use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::common::{DIRECTIVE_SIGIL, EVAL_KEY, EXTEND_KEY, REQUIRE_KEY, SET_KEY};
use crate::document::{CollectionPayload, Document, Value};
use crate::errors::{ErrorKind, SeedbedError, SeedbedResult};
use crate::format;

/// Extension templates extracted from a payload's top-level `$` keys,
/// keyed by their full name including the sigil.
pub type ExtensionTable = IndexMap<String, Document>;

/// Expands every directive in a raw payload tree into a plain
/// [CollectionPayload].
///
/// `source` is the path of the file the tree was parsed from and anchors
/// `$require` resolution; passing `None` makes `$require` a
/// [ErrorKind::ConfigurationError].
pub fn expand(raw: &Document, source: Option<&Path>) -> SeedbedResult<CollectionPayload> {
    let mut visited = HashSet::new();
    if let Some(path) = source {
        if let Ok(canonical) = path.canonicalize() {
            visited.insert(canonical);
        }
    }

    let merged = resolve_requires(raw, source, &mut visited)?;
    let (extensions, collections) = split_extensions(&merged)?;

    let mut payload = CollectionPayload::new();
    for (name, items) in collections {
        let mut documents = Vec::with_capacity(items.len());
        for item in &items {
            match item {
                Value::Document(doc) => documents.push(expand_document(doc, &extensions)?),
                other => {
                    log::error!("Collection '{}' entries must be documents", name);
                    return Err(SeedbedError::new(
                        &format!(
                            "Collection '{}' entries must be documents, found {:?}",
                            name, other
                        ),
                        ErrorKind::ResolutionError,
                    ));
                }
            }
        }
        payload.insert(name, documents);
    }

    Ok(payload)
}

/// Resolves the top-level `$require` directive, recursively, and merges
/// the required payloads underneath the local one.
fn resolve_requires(
    raw: &Document,
    source: Option<&Path>,
    visited: &mut HashSet<PathBuf>,
) -> SeedbedResult<Document> {
    let mut root = raw.clone();
    let require = match root.remove(REQUIRE_KEY) {
        Some(value) => value,
        None => return Ok(root),
    };

    let relative = match require {
        Value::String(path) => path,
        other => {
            log::error!("$require expects a relative path string");
            return Err(SeedbedError::new(
                &format!("$require expects a relative path string, found {:?}", other),
                ErrorKind::ResolutionError,
            ));
        }
    };

    let source = source.ok_or_else(|| {
        log::error!("Cannot $require '{}' without a source file context", relative);
        SeedbedError::new(
            &format!(
                "Cannot $require '{}' without a source file context",
                relative
            ),
            ErrorKind::ConfigurationError,
        )
    })?;

    let directory = match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let target = directory.join(&relative);

    let canonical = target.canonicalize().map_err(|err| {
        SeedbedError::new_with_cause(
            &format!("Cannot read $require'd file '{}'", target.display()),
            ErrorKind::ResolutionError,
            err.into(),
        )
    })?;
    if !visited.insert(canonical) {
        log::error!("Circular $require involving '{}'", target.display());
        return Err(SeedbedError::new(
            &format!("Circular $require involving '{}'", target.display()),
            ErrorKind::ResolutionError,
        ));
    }

    let required_raw = format::read_payload(&target).map_err(|err| {
        // an unsupported extension stays a configuration problem; everything
        // else surfaces as a resolution failure of this $require
        if err.kind() == &ErrorKind::ConfigurationError {
            err
        } else {
            SeedbedError::new_with_cause(
                &format!("Cannot read $require'd file '{}'", target.display()),
                ErrorKind::ResolutionError,
                err,
            )
        }
    })?;
    let required = resolve_requires(&required_raw, Some(&target), visited)?;

    for (key, value) in required.iter() {
        if key.starts_with(DIRECTIVE_SIGIL) {
            // local template definitions win over required ones
            if !root.contains_key(key) {
                root.insert(key.clone(), value.clone());
            }
            continue;
        }

        match root.get_field(key) {
            None => {
                root.insert(key.clone(), value.clone());
            }
            Some(Value::Array(local_docs)) => {
                let required_docs = match value {
                    Value::Array(docs) => docs.clone(),
                    _ => {
                        return Err(collection_shape_error(key));
                    }
                };
                // required documents seed the base, local ones follow
                let mut combined = required_docs;
                combined.extend(local_docs.clone());
                root.insert(key.clone(), Value::Array(combined));
            }
            Some(_) => {
                return Err(collection_shape_error(key));
            }
        }
    }

    Ok(root)
}

fn collection_shape_error(name: &str) -> SeedbedError {
    log::error!("Collection '{}' must map to an array of documents", name);
    SeedbedError::new(
        &format!("Collection '{}' must map to an array of documents", name),
        ErrorKind::ResolutionError,
    )
}

/// Splits a merged payload tree into its extension table and its
/// collection entries.
fn split_extensions(
    root: &Document,
) -> SeedbedResult<(ExtensionTable, Vec<(String, Vec<Value>)>)> {
    let mut extensions = ExtensionTable::new();
    let mut collections = Vec::new();

    for (key, value) in root.iter() {
        if key.starts_with(DIRECTIVE_SIGIL) {
            match value {
                Value::Document(template) => {
                    extensions.insert(key.clone(), template.clone());
                }
                _ => {
                    log::error!("Extension template '{}' must be a document", key);
                    return Err(SeedbedError::new(
                        &format!("Extension template '{}' must be a document", key),
                        ErrorKind::ResolutionError,
                    ));
                }
            }
        } else {
            match value {
                Value::Array(items) => collections.push((key.clone(), items.clone())),
                _ => return Err(collection_shape_error(key)),
            }
        }
    }

    Ok((extensions, collections))
}

/// Expands one document: `$extend` fill, `$eval` replacement in field
/// order, depth-first recursion, then `$set` assignment. Returns a new,
/// directive-free document.
fn expand_document(doc: &Document, extensions: &ExtensionTable) -> SeedbedResult<Document> {
    // collect own fields, directives set aside
    let mut merged: IndexMap<String, Value> = IndexMap::new();
    for (key, value) in doc.iter() {
        if key != EXTEND_KEY {
            merged.insert(key.clone(), value.clone());
        }
    }

    // walk the $extend chain, filling fields the document does not define
    let mut next_extend = match doc.get_field(EXTEND_KEY) {
        None => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(other) => {
            log::error!("$extend expects an extension name");
            return Err(SeedbedError::new(
                &format!("$extend expects an extension name, found {:?}", other),
                ErrorKind::ResolutionError,
            ));
        }
    };
    let mut seen: HashSet<String> = HashSet::new();
    while let Some(name) = next_extend.take() {
        if !seen.insert(name.clone()) {
            log::error!("Circular $extend chain through '{}'", name);
            return Err(SeedbedError::new(
                &format!("Circular $extend chain through '{}'", name),
                ErrorKind::ResolutionError,
            ));
        }
        let template = extensions.get(&name).ok_or_else(|| {
            log::error!("Unknown extension '{}' in $extend", name);
            SeedbedError::new(
                &format!("Unknown extension '{}' in $extend", name),
                ErrorKind::ResolutionError,
            )
        })?;

        for (key, value) in template.iter() {
            if key == EXTEND_KEY {
                // a template may extend further; the chain continues after
                // this template's own fields
                match value {
                    Value::String(chained) => next_extend = Some(chained.clone()),
                    _ => {
                        return Err(SeedbedError::new(
                            "$extend expects an extension name",
                            ErrorKind::ResolutionError,
                        ))
                    }
                }
                continue;
            }
            if !merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    let set_map = match merged.shift_remove(SET_KEY) {
        None => None,
        Some(Value::Document(map)) => Some(map),
        Some(other) => {
            log::error!("$set expects a map of dotted paths to values");
            return Err(SeedbedError::new(
                &format!("$set expects a map of dotted paths to values, found {:?}", other),
                ErrorKind::ResolutionError,
            ));
        }
    };

    // plain fields resolve first, in order; $eval holders resolve after
    // them, in field order, each seeing every plain field (including
    // template-inherited ones) and every earlier $eval result
    let mut resolved: IndexMap<String, Option<Value>> = IndexMap::new();
    let mut context = Document::new();
    for (key, value) in &merged {
        if eval_expression(value)?.is_some() {
            resolved.insert(key.clone(), None);
        } else {
            let expanded = expand_value(value, extensions, &context)?;
            context.insert(key.clone(), expanded.clone());
            resolved.insert(key.clone(), Some(expanded));
        }
    }

    let mut out = Document::new();
    for (key, slot) in resolved {
        match slot {
            Some(value) => out.insert(key, value),
            None => {
                let expression = match merged.get(&key).map(eval_expression) {
                    Some(Ok(Some(expression))) => expression.to_string(),
                    _ => {
                        return Err(SeedbedError::new(
                            "$eval expects an expression string",
                            ErrorKind::ResolutionError,
                        ))
                    }
                };
                let result = eval::evaluate(&expression, &context)?;
                context.insert(key.clone(), result.clone());
                out.insert(key, result);
            }
        }
    }

    // $set runs last, so computed paths overwrite extended and evaluated
    // fields but never the other way around
    if let Some(set_map) = set_map {
        for (path, value) in set_map.iter() {
            let expanded = expand_value(value, extensions, &out)?;
            out.put(path, expanded).map_err(|err| {
                SeedbedError::new_with_cause(
                    &format!("Invalid $set path '{}'", path),
                    ErrorKind::ResolutionError,
                    err,
                )
            })?;
        }
    }

    Ok(out)
}

/// Returns the expression of a `$eval` holder value, or `None` when the
/// value is not a holder. A holder with a non-string expression is an
/// error.
fn eval_expression(value: &Value) -> SeedbedResult<Option<&str>> {
    let Value::Document(inner) = value else {
        return Ok(None);
    };
    if !inner.contains_key(EVAL_KEY) {
        return Ok(None);
    }
    match inner.get_field(EVAL_KEY) {
        Some(Value::String(expression)) => Ok(Some(expression)),
        _ => {
            log::error!("$eval expects an expression string");
            Err(SeedbedError::new(
                "$eval expects an expression string",
                ErrorKind::ResolutionError,
            ))
        }
    }
}

/// Expands a single value. `enclosing` is the resolved portion of the
/// document that directly contains this value; it is the evaluation
/// context for `$eval` holders, including holders inside arrays.
fn expand_value(
    value: &Value,
    extensions: &ExtensionTable,
    enclosing: &Document,
) -> SeedbedResult<Value> {
    if let Some(expression) = eval_expression(value)? {
        return eval::evaluate(expression, enclosing);
    }
    match value {
        Value::Document(inner) => Ok(Value::Document(expand_document(inner, extensions)?)),
        Value::Array(items) => {
            let expanded: SeedbedResult<Vec<Value>> = items
                .iter()
                .map(|item| expand_value(item, extensions, enclosing))
                .collect();
            Ok(Value::Array(expanded?))
        }
        other => Ok(other.clone()),
    }
}
