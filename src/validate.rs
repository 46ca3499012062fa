//! Conversion of an untrusted JSON array into display-ready annotations.
//!
//! [`validate`] is pure and total: malformed entries are skipped and
//! malformed fields degrade to empty strings, never to an error.

use serde::Deserialize;
use serde_json::Value;

use crate::models::Annotation;
use crate::sanitize::{clean_text, clean_url};

/// Loosely-typed shape of one remote record. Every field is optional and
/// unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct RawAnnotation {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<Value>,
    #[serde(default)]
    image_url: Option<Value>,
    #[serde(default)]
    content: Option<Value>,
}

/// Textual form of a scalar field. Strings pass through, numbers and
/// booleans are stringified, anything else is empty.
fn field_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Validate and sanitize a parsed remote payload.
///
/// Non-object entries are skipped, entries whose sanitized title is empty
/// are dropped, and the survivors keep their input order.
pub fn validate(raw: &[Value]) -> Vec<Annotation> {
    let mut validated = Vec::with_capacity(raw.len());

    for item in raw {
        if !item.is_object() {
            continue;
        }

        let record: RawAnnotation = serde_json::from_value(item.clone()).unwrap_or_default();

        let annotation = Annotation {
            title: clean_text(&field_text(record.title.as_ref())),
            description: clean_text(&field_text(record.description.as_ref())),
            kind: clean_text(&field_text(record.kind.as_ref())),
            image_url: clean_url(&field_text(record.image_url.as_ref())),
            content: clean_text(&field_text(record.content.as_ref())),
        };

        if !annotation.title.is_empty() {
            validated.push(annotation);
        }
    }

    let skipped = raw.len() - validated.len();
    if skipped > 0 {
        tracing::debug!(skipped, kept = validated.len(), "dropped invalid annotation records");
    }

    validated
}
