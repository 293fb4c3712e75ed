//! Query fragments and their constructors
//!
//! [`QueryFragment`] is one backend query-language clause. The enum is
//! externally tagged so each variant serializes under its discriminating
//! key, e.g. `{"range-constraint-query": {...}}`. Combinators nest: an
//! `and-query`/`or-query` carries a `queries` list, a `not-query` wraps a
//! single fragment directly.

use serde::{Deserialize, Serialize};

use crate::scalar::{GeoBox, RangeOperator, Scalar};

/// One backend query-language clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryFragment {
    #[serde(rename = "range-constraint-query")]
    RangeConstraint(RangeConstraintQuery),
    #[serde(rename = "geospatial-constraint-query")]
    GeospatialConstraint(GeospatialConstraintQuery),
    #[serde(rename = "custom-constraint-query")]
    CustomConstraint(CustomConstraintQuery),
    #[serde(rename = "value-constraint-query")]
    ValueConstraint(TermConstraintQuery),
    #[serde(rename = "word-constraint-query")]
    WordConstraint(TermConstraintQuery),
    #[serde(rename = "collection-constraint-query")]
    CollectionConstraint(CollectionConstraintQuery),
    #[serde(rename = "and-query")]
    And(QueryList),
    #[serde(rename = "or-query")]
    Or(QueryList),
    #[serde(rename = "not-query")]
    Not(Box<QueryFragment>),
}

/// Payload of a `range-constraint-query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeConstraintQuery {
    #[serde(rename = "constraint-name")]
    pub constraint_name: String,
    #[serde(rename = "range-operator")]
    pub range_operator: RangeOperator,
    pub value: Vec<Scalar>,
}

/// Payload of a `geospatial-constraint-query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeospatialConstraintQuery {
    #[serde(rename = "constraint-name")]
    pub constraint_name: String,
    #[serde(rename = "box")]
    pub boxes: Vec<GeoBox>,
}

/// Payload of a `custom-constraint-query`: either plain text terms or, for
/// custom geospatial constraints, a list of boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomConstraintQuery {
    #[serde(rename = "constraint-name")]
    pub constraint_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<Scalar>>,
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub boxes: Option<Vec<GeoBox>>,
}

/// Payload shared by `value-constraint-query` and `word-constraint-query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermConstraintQuery {
    #[serde(rename = "constraint-name")]
    pub constraint_name: String,
    pub text: Vec<Scalar>,
}

/// Payload of a `collection-constraint-query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConstraintQuery {
    #[serde(rename = "constraint-name")]
    pub constraint_name: String,
    pub uri: Vec<Scalar>,
}

/// The `queries` list carried by `and-query`/`or-query` and the top-level
/// `where` wrapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryList {
    pub queries: Vec<QueryFragment>,
}

/// Build a `range-constraint-query` fragment.
#[must_use]
pub fn range_constraint(
    name: impl Into<String>,
    operator: RangeOperator,
    values: Vec<Scalar>,
) -> QueryFragment {
    QueryFragment::RangeConstraint(RangeConstraintQuery {
        constraint_name: name.into(),
        range_operator: operator,
        value: values,
    })
}

/// Build a `geospatial-constraint-query` fragment.
#[must_use]
pub fn geospatial_constraint(name: impl Into<String>, boxes: Vec<GeoBox>) -> QueryFragment {
    QueryFragment::GeospatialConstraint(GeospatialConstraintQuery {
        constraint_name: name.into(),
        boxes,
    })
}

/// Build a `custom-constraint-query` fragment carrying text terms.
#[must_use]
pub fn custom_constraint(name: impl Into<String>, text: Vec<Scalar>) -> QueryFragment {
    QueryFragment::CustomConstraint(CustomConstraintQuery {
        constraint_name: name.into(),
        text: Some(text),
        boxes: None,
    })
}

/// Build a `custom-constraint-query` fragment carrying geospatial boxes.
#[must_use]
pub fn custom_geospatial_constraint(name: impl Into<String>, boxes: Vec<GeoBox>) -> QueryFragment {
    QueryFragment::CustomConstraint(CustomConstraintQuery {
        constraint_name: name.into(),
        text: None,
        boxes: Some(boxes),
    })
}

/// Build a `value-constraint-query` fragment.
#[must_use]
pub fn value_constraint(name: impl Into<String>, text: Vec<Scalar>) -> QueryFragment {
    QueryFragment::ValueConstraint(TermConstraintQuery {
        constraint_name: name.into(),
        text,
    })
}

/// Build a `word-constraint-query` fragment.
#[must_use]
pub fn word_constraint(name: impl Into<String>, text: Vec<Scalar>) -> QueryFragment {
    QueryFragment::WordConstraint(TermConstraintQuery {
        constraint_name: name.into(),
        text,
    })
}

/// Build a `collection-constraint-query` fragment.
#[must_use]
pub fn collection_constraint(name: impl Into<String>, uris: Vec<Scalar>) -> QueryFragment {
    QueryFragment::CollectionConstraint(CollectionConstraintQuery {
        constraint_name: name.into(),
        uri: uris,
    })
}

/// Combine fragments with AND semantics.
#[must_use]
pub fn and(queries: Vec<QueryFragment>) -> QueryFragment {
    QueryFragment::And(QueryList { queries })
}

/// Combine fragments with OR semantics.
#[must_use]
pub fn or(queries: Vec<QueryFragment>) -> QueryFragment {
    QueryFragment::Or(QueryList { queries })
}

/// Negate a fragment.
#[must_use]
pub fn not(query: QueryFragment) -> QueryFragment {
    QueryFragment::Not(Box::new(query))
}
