//! Schema-less tracking documents
//!
//! Table metadata, metric metadata and summaries are free-form JSON objects.
//! They are always objects at the top level, which is what makes the
//! shallow-merge rule below well defined.

use serde_json::{Map, Value};

use crate::{Error, Result};

/// A free-form JSON object.
pub type Document = Map<String, Value>;

/// Interpret a wire value as a document.
///
/// # Errors
///
/// Returns [`Error::InvalidPayload`] if `value` is not a JSON object.
pub fn from_value(what: &str, value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidPayload(format!(
            "{what} must be a JSON object, got {}",
            kind(&other)
        ))),
    }
}

/// Shallow merge: keys of `update` overwrite, keys absent from it are kept.
pub fn merge(base: &mut Document, update: Document) {
    for (key, value) in update {
        base.insert(key, value);
    }
}

/// Reject documents whose encoded size exceeds `max_bytes`.
///
/// # Errors
///
/// Returns [`Error::InvalidPayload`] when the document is too large.
pub fn ensure_within(what: &str, document: &Document, max_bytes: usize) -> Result<()> {
    let size = serde_json::to_vec(document)?.len();
    if size > max_bytes {
        return Err(Error::InvalidPayload(format!(
            "{what} is {size} bytes, limit is {max_bytes}"
        )));
    }
    Ok(())
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        from_value("doc", value).unwrap()
    }

    #[test]
    fn test_merge_is_shallow_overwrite() {
        let mut base = doc(json!({"x": 1, "nested": {"a": 1}}));
        merge(&mut base, doc(json!({"y": 2, "nested": {"b": 2}})));

        assert_eq!(Value::Object(base), json!({"x": 1, "y": 2, "nested": {"b": 2}}));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(matches!(from_value("summary", json!([1, 2])), Err(Error::InvalidPayload(_))));
        assert!(from_value("summary", Value::Null).is_err());
    }

    #[test]
    fn test_ensure_within() {
        let d = doc(json!({"k": "0123456789"}));
        assert!(ensure_within("doc", &d, 1024).is_ok());
        assert!(matches!(ensure_within("doc", &d, 4), Err(Error::InvalidPayload(_))));
    }
}
