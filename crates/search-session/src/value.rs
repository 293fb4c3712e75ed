//! Constraint value model and URL token codec
//!
//! [`ConstraintValue`] is the closed sum over the three filter datum shapes:
//! a scalar, a min/max range, and a geographic bounding box. Untyped input
//! (facet clicks, backend definitions) enters through the single
//! [`ConstraintValue::classify`]/[`ConstraintValue::from_raw`] boundary;
//! everything past it pattern-matches the enum.
//!
//! Values serialize to compact URL tokens with `_` as the field separator.
//! The token encoding percent-escapes the separator itself, so a scalar
//! containing a literal `_` never collides with a range/box field boundary.
//!
//! [`ValueSet`] is the owning container: an insertion-ordered arena handing
//! out stable [`ValueId`]s, with remove-once semantics (a second removal of
//! the same handle is an error, not a no-op).

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use search_session_query::{GeoBox, Scalar};

use crate::error::{Result, SearchError};

/// Field separator inside value tokens.
pub const TOKEN_SEPARATOR: char = '_';

/// Escape set for token fields: URI-component encoding plus the token field
/// separator itself.
const TOKEN_FIELD: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Escape set for URL components where `_` has no structural meaning
/// (constraint names in parameter entries).
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub(crate) fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, URI_COMPONENT).to_string()
}

pub(crate) fn decode_component(encoded: &str) -> Option<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

fn encode_field(raw: &str) -> String {
    utf8_percent_encode(raw, TOKEN_FIELD).to_string()
}

/// The three value shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Value,
    Range,
    Box,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value => write!(f, "value"),
            Self::Range => write!(f, "range"),
            Self::Box => write!(f, "box"),
        }
    }
}

/// One filter datum: a scalar, a range, or a bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintValue {
    /// Scalar criterion, with optional display metadata from a facet result.
    Value {
        value: Scalar,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        count: Option<u64>,
    },
    /// Min/max range; at least one bound is present.
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<Scalar>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<Scalar>,
    },
    /// Normalized geographic rectangle.
    Box {
        rect: GeoBox,
        #[serde(skip_serializing_if = "Option::is_none")]
        count: Option<u64>,
    },
}

impl ConstraintValue {
    /// Build a scalar value without metadata.
    #[must_use]
    pub fn scalar(value: impl Into<Scalar>) -> Self {
        Self::Value {
            value: value.into(),
            name: None,
            count: None,
        }
    }

    /// The shape of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Value { .. } => ValueKind::Value,
            Self::Range { .. } => ValueKind::Range,
            Self::Box { .. } => ValueKind::Box,
        }
    }

    /// Classify raw input by shape: a string or a `value` field means a
    /// scalar, `min`/`max` a range, `north`/`n` a box. Everything else is
    /// rejected.
    pub fn classify(raw: &Value) -> Result<ValueKind> {
        if raw.is_string() {
            return Ok(ValueKind::Value);
        }
        if let Some(object) = raw.as_object() {
            if object.contains_key("value") {
                return Ok(ValueKind::Value);
            }
            if object.contains_key("min") || object.contains_key("max") {
                return Ok(ValueKind::Range);
            }
            if object.contains_key("north") || object.contains_key("n") {
                return Ok(ValueKind::Box);
            }
        }
        Err(SearchError::UnknownValueKind {
            detail: raw.to_string(),
        })
    }

    /// Classify and normalize raw input into a typed value.
    ///
    /// This is the only place untyped input becomes a `ConstraintValue`;
    /// box inputs are normalized from either field spelling here.
    pub fn from_raw(raw: &Value) -> Result<Self> {
        let kind = Self::classify(raw)?;
        if let Some(s) = raw.as_str() {
            return Ok(Self::scalar(s));
        }
        let bad_shape = || SearchError::UnknownValueKind {
            detail: raw.to_string(),
        };
        let object = raw.as_object().ok_or_else(bad_shape)?;
        match kind {
            ValueKind::Value => {
                let value = scalar_field(raw, object.get("value"))?.ok_or_else(bad_shape)?;
                Ok(Self::Value {
                    value,
                    name: object.get("name").and_then(Value::as_str).map(String::from),
                    count: object.get("count").and_then(Value::as_u64),
                })
            }
            ValueKind::Range => {
                let min = scalar_field(raw, object.get("min"))?;
                let max = scalar_field(raw, object.get("max"))?;
                if min.is_none() && max.is_none() {
                    return Err(bad_shape());
                }
                Ok(Self::Range { min, max })
            }
            ValueKind::Box => {
                let spelled = if object.contains_key("north") {
                    ["south", "west", "north", "east"]
                } else {
                    ["s", "w", "n", "e"]
                };
                let mut edges = Vec::with_capacity(4);
                for key in spelled {
                    edges.push(scalar_field(raw, object.get(key))?.ok_or_else(bad_shape)?);
                }
                let [south, west, north, east] =
                    <[Scalar; 4]>::try_from(edges).map_err(|_| bad_shape())?;
                Ok(Self::Box {
                    rect: GeoBox {
                        south,
                        west,
                        north,
                        east,
                    },
                    count: object.get("count").and_then(Value::as_u64),
                })
            }
        }
    }

    /// Parse a URL token.
    ///
    /// Grammar, with `_` separating fields: no separator means a scalar;
    /// one non-empty field beside an empty boundary field means a one-sided
    /// range (`3_` is min-only, `_7` max-only); two fields a min/max range;
    /// four fields a box in south/west/north/east order.
    pub fn from_token(token: &str) -> Result<Self> {
        let unparsable = || SearchError::UnparsableToken {
            token: token.to_string(),
        };

        if !token.contains(TOKEN_SEPARATOR) {
            let decoded = decode_component(token).ok_or_else(unparsable)?;
            return Ok(Self::scalar(decoded));
        }

        let parts: Vec<&str> = token.split(TOKEN_SEPARATOR).collect();
        let mut fields = Vec::with_capacity(parts.len());
        for part in &parts {
            let decoded = decode_component(part).ok_or_else(unparsable)?;
            if !decoded.is_empty() {
                fields.push(decoded);
            }
        }

        match fields.len() {
            1 => {
                let bound = Scalar::String(fields.remove(0));
                if parts.first().is_some_and(|p| p.is_empty()) {
                    Ok(Self::Range {
                        min: None,
                        max: Some(bound),
                    })
                } else {
                    Ok(Self::Range {
                        min: Some(bound),
                        max: None,
                    })
                }
            }
            2 => {
                let max = fields.pop().map(Scalar::String);
                let min = fields.pop().map(Scalar::String);
                Ok(Self::Range { min, max })
            }
            4 => {
                let [south, west, north, east] =
                    <[String; 4]>::try_from(fields).map_err(|_| unparsable())?;
                Ok(Self::Box {
                    rect: GeoBox {
                        south: Scalar::String(south),
                        west: Scalar::String(west),
                        north: Scalar::String(north),
                        east: Scalar::String(east),
                    },
                    count: None,
                })
            }
            _ => Err(unparsable()),
        }
    }

    /// Render this value as a URL token; the exact inverse of
    /// [`Self::from_token`]. A missing range bound encodes as the empty
    /// string.
    #[must_use]
    pub fn to_token(&self) -> String {
        match self {
            Self::Value { value, .. } => encode_field(&value.to_string()),
            Self::Range { min, max } => {
                let encode_bound = |bound: &Option<Scalar>| {
                    bound
                        .as_ref()
                        .map_or_else(String::new, |s| encode_field(&s.to_string()))
                };
                format!(
                    "{}{TOKEN_SEPARATOR}{}",
                    encode_bound(min),
                    encode_bound(max)
                )
            }
            Self::Box { rect, .. } => [&rect.south, &rect.west, &rect.north, &rect.east]
                .map(|edge| encode_field(&edge.to_string()))
                .join(&TOKEN_SEPARATOR.to_string()),
        }
    }
}

fn scalar_field(raw: &Value, field: Option<&Value>) -> Result<Option<Scalar>> {
    match field {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(Scalar::String(s.clone()))),
        Some(Value::Number(n)) => Ok(Some(Scalar::Number(n.clone()))),
        Some(_) => Err(SearchError::UnknownValueKind {
            detail: raw.to_string(),
        }),
    }
}

/// Stable handle to a value inside its owning [`ValueSet`].
///
/// Handles are only meaningful for the set that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(u64);

/// Insertion-ordered owning container of constraint values.
#[derive(Debug, Clone, Default)]
pub struct ValueSet {
    entries: Vec<(ValueId, ConstraintValue)>,
    next_id: u64,
}

impl ValueSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value; order is insertion order.
    pub fn insert(&mut self, value: ConstraintValue) -> ValueId {
        let id = ValueId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, value));
        id
    }

    /// Remove a value by handle.
    ///
    /// A handle can be spent once; removing it again (or passing a handle
    /// from another set) fails with [`SearchError::AlreadyRemoved`].
    pub fn remove(&mut self, id: ValueId) -> Result<ConstraintValue> {
        let index = self
            .entries
            .iter()
            .position(|(entry_id, _)| *entry_id == id)
            .ok_or(SearchError::AlreadyRemoved)?;
        Ok(self.entries.remove(index).1)
    }

    #[must_use]
    pub fn get(&self, id: ValueId) -> Option<&ConstraintValue> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConstraintValue> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn entries(&self) -> impl Iterator<Item = (ValueId, &ConstraintValue)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
