//! Scalar and geographic primitives shared across the query vocabulary

use std::fmt;

use serde::{Deserialize, Serialize};

/// A constraint scalar: a string or a JSON number.
///
/// Backend range indexes compare lexical forms server-side, so no numeric
/// coercion happens here; a value parsed from a URL token stays a string
/// even when it looks numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// String scalar.
    String(String),
    /// Numeric scalar, preserving the JSON lexical form (int vs float).
    Number(serde_json::Number),
}

impl Scalar {
    /// Returns the string form if this scalar is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(serde_json::Number::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Number(serde_json::Number::from(value))
    }
}

impl From<serde_json::Number> for Scalar {
    fn from(value: serde_json::Number) -> Self {
        Self::Number(value)
    }
}

/// A normalized geographic bounding rectangle.
///
/// Always stored with the long field spellings; inputs using `n`/`s`/`e`/`w`
/// are normalized at the classification boundary before a `GeoBox` exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoBox {
    pub south: Scalar,
    pub west: Scalar,
    pub north: Scalar,
    pub east: Scalar,
}

impl GeoBox {
    /// Build a box from its four edges, south/west/north/east order.
    pub fn new(
        south: impl Into<Scalar>,
        west: impl Into<Scalar>,
        north: impl Into<Scalar>,
        east: impl Into<Scalar>,
    ) -> Self {
        Self {
            south: south.into(),
            west: west.into(),
            north: north.into(),
            east: east.into(),
        }
    }
}

/// Range comparison operator carried by a range-constraint fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RangeOperator {
    Eq,
    Ne,
    Ge,
    Le,
    Lt,
    Gt,
}

impl RangeOperator {
    /// The operator emitted when the same bound is excluded instead of
    /// matched: EQ↔NE, GE↔LT, LE↔GT.
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Ge => Self::Lt,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
        }
    }

    /// The wire spelling of this operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Ge => "GE",
            Self::Le => "LE",
            Self::Lt => "LT",
            Self::Gt => "GT",
        }
    }
}

impl fmt::Display for RangeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
