//! Response coercion: free-form model text → one typed value per schema field.
//!
//! Models are asked for a bare JSON object but routinely wrap it in code
//! fences, quote numbers (`"12.0"`) or answer `"N/A"`. [`coerce_response`]
//! tolerates all of that and never fails its caller:
//!
//! 1. trim, strip an outer code fence and a bare language-tag line
//! 2. parse a JSON object; if that fails, retry on the outermost `{ … }` span
//! 3. for each schema field, coerce the value to the declared [`FieldType`];
//!    a value that cannot be coerced becomes [`FieldValue::Null`] plus a
//!    [`FieldWarning`]
//!
//! The result always holds exactly one entry per schema field, in schema
//! order. Keys the schema does not name are ignored.

use crate::sanitize::sanitize;
use crate::schema::{FieldSpec, FieldType, Schema};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// A coerced field value.
///
/// Serialises untagged, so structured output keeps native JSON typing:
/// `null`, numbers, strings and booleans.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Whether this value is admissible for a field declared as `field_type`.
    /// Null is admissible everywhere.
    pub fn conforms_to(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (FieldValue::Null, _)
                | (FieldValue::Int(_), FieldType::Int)
                | (FieldValue::Float(_), FieldType::Float)
                | (FieldValue::Str(_), FieldType::String)
                | (FieldValue::Bool(_), FieldType::Bool)
        )
    }

    /// Text rendering for a CSV cell. Null renders as an empty cell.
    pub fn render_cell(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => format!("{f:?}"),
            FieldValue::Str(s) => s.clone(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_cell())
    }
}

/// Field name → value, in schema order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldValues(Vec<(String, FieldValue)>);

impl FieldValues {
    /// Every schema field present and null.
    pub fn nulls(schema: &Schema) -> Self {
        Self(
            schema
                .field_names()
                .map(|name| (name.to_string(), FieldValue::Null))
                .collect(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(name, _)| name == field).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn all_null(&self) -> bool {
        self.0.iter().all(|(_, v)| v.is_null())
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A single field that could not be coerced cleanly.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWarning {
    pub field: String,
    /// The raw value as the model returned it.
    pub raw: String,
    pub reason: String,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (got {})", self.field, self.reason, self.raw)
    }
}

/// Outcome of coercing one model response.
#[derive(Debug, Clone)]
pub struct Coercion {
    pub values: FieldValues,
    pub warnings: Vec<FieldWarning>,
    /// Set when no JSON object could be recovered; every value is then null.
    pub parse_error: Option<String>,
}

impl Coercion {
    pub fn is_parsed(&self) -> bool {
        self.parse_error.is_none()
    }
}

static RE_SINGLE_LINE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:[A-Za-z][\w+-]*)?\s*(.*?)\s*```$").unwrap());

static RE_LANGUAGE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][\w+-]*$").unwrap());

/// Trim and remove an outer code fence, plus a bare language-tag line if one
/// follows the opening fence.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    if !trimmed.contains('\n') {
        return RE_SINGLE_LINE_FENCE
            .captures(trimmed)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| trimmed.trim_matches('`').to_string());
    }

    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines.last().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.pop();
    }
    if lines.first().is_some_and(|l| RE_LANGUAGE_TAG.is_match(l.trim())) {
        lines.remove(0);
    }
    lines.join("\n").trim().to_string()
}

/// Parse a JSON object, falling back to the outermost brace-delimited span.
fn parse_object(text: &str) -> Result<serde_json::Map<String, Value>, String> {
    let first_err = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => format!("expected a JSON object, got {}", json_kind(&other)),
        Err(e) => e.to_string(),
    };

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Ok(map);
            }
        }
    }
    Err(first_err)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Coerce a raw model response against `schema`. Never fails.
pub fn coerce_response(raw: &str, schema: &Schema) -> Coercion {
    let text = strip_code_fences(raw);

    let object = match parse_object(&text) {
        Ok(map) => map,
        Err(detail) => {
            warn!(
                "Failed to parse JSON response: {} (response starts: {:?})",
                detail,
                preview(&text, 500)
            );
            return Coercion {
                values: FieldValues::nulls(schema),
                warnings: Vec::new(),
                parse_error: Some(detail),
            };
        }
    };

    let mut values = Vec::with_capacity(schema.len());
    let mut warnings = Vec::new();
    for spec in schema.fields() {
        let (value, warning) = coerce_field(spec, object.get(&spec.field));
        if let Some(w) = warning {
            warn!("Field coercion: {}", w);
            warnings.push(w);
        }
        values.push((spec.field.clone(), value));
    }

    Coercion {
        values: FieldValues(values),
        warnings,
        parse_error: None,
    }
}

/// Coerce one field. Absent, null and blank values are null without warning.
pub fn coerce_field(spec: &FieldSpec, raw: Option<&Value>) -> (FieldValue, Option<FieldWarning>) {
    let raw = match raw {
        None | Some(Value::Null) => return (FieldValue::Null, None),
        Some(Value::String(s)) if s.trim().is_empty() => return (FieldValue::Null, None),
        Some(v) => v,
    };

    let warn_null = |reason: &str| {
        (
            FieldValue::Null,
            Some(FieldWarning {
                field: spec.field.clone(),
                raw: raw.to_string(),
                reason: reason.to_string(),
            }),
        )
    };

    match spec.field_type {
        FieldType::Int => {
            if let Some(i) = raw.as_i64() {
                return (FieldValue::Int(i), None);
            }
            let Some(f) = as_number(raw) else {
                return warn_null("could not convert to int");
            };
            if !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
                return warn_null("int out of range");
            }
            let truncated = f.trunc();
            let warning = (truncated != f).then(|| FieldWarning {
                field: spec.field.clone(),
                raw: raw.to_string(),
                reason: "fractional part discarded".to_string(),
            });
            (FieldValue::Int(truncated as i64), warning)
        }
        FieldType::Float => match as_number(raw) {
            Some(f) if f.is_finite() => (FieldValue::Float(f), None),
            _ => warn_null("could not convert to float"),
        },
        FieldType::Bool => match as_bool(raw) {
            Some(b) => (FieldValue::Bool(b), None),
            None => warn_null("could not convert to bool"),
        },
        FieldType::String => {
            let text = sanitize(&stringify(raw));
            if text.is_empty() {
                (FieldValue::Null, None)
            } else {
                (FieldValue::Str(text), None)
            }
        }
    }
}

/// Numeric reading of a JSON value. Booleans count as 1 and 0.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
