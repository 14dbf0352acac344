//! Typed per-object attribute values.
//!
//! VOC objects carry an open-ended set of child tags (`pose`, `difficult`,
//! custom flags, ...). The reader infers a value's type from the tag name
//! alone: a small table of known tags maps to a kind, and every other tag is
//! read as an integer-coded boolean.

use std::fmt;

use serde::Serialize;

/// A single attribute value attached to a bounding box.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Float(f64),
    String(String),
}

/// The kind of value a tag is read as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrKind {
    Bool,
    Float,
    String,
}

/// Tags with a fixed, non-boolean kind.
const KNOWN_TAG_KINDS: &[(&str, AttrKind)] =
    &[("pose", AttrKind::String), ("confidence", AttrKind::Float)];

impl AttrKind {
    /// Returns the kind the reader uses for `tag`.
    pub fn for_tag(tag: &str) -> AttrKind {
        KNOWN_TAG_KINDS
            .iter()
            .find(|(known, _)| *known == tag)
            .map(|(_, kind)| *kind)
            .unwrap_or(AttrKind::Bool)
    }
}

impl AttrValue {
    /// Truthiness: non-zero numbers, non-empty strings and `true`.
    ///
    /// NaN counts as truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Bool(value) => *value,
            AttrValue::Float(value) => *value != 0.0,
            AttrValue::String(value) => !value.is_empty(),
        }
    }

    /// Renders the value as the `"1"`/`"0"` text VOC uses for flags.
    pub fn bool_text(&self) -> &'static str {
        if self.is_truthy() {
            "1"
        } else {
            "0"
        }
    }

    /// Coerces the value to an integer pixel coordinate.
    ///
    /// Floats are truncated toward zero; strings must hold a decimal integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Bool(value) => Some(i64::from(*value)),
            AttrValue::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            AttrValue::Float(_) => None,
            AttrValue::String(value) => value.trim().parse::<i64>().ok(),
        }
    }

    /// Returns the inner string for `String` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the inner flag for `Bool` values.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the inner number for `Float` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(_) => f.write_str(self.bool_text()),
            AttrValue::Float(value) => write!(f, "{value}"),
            AttrValue::String(value) => f.write_str(value),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}
