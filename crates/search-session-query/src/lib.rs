//! Structured-query fragment vocabulary
//!
//! This crate provides the typed vocabulary of backend query fragments and
//! the fixed set of constructors the search-session state manager consumes:
//! per-kind constraint fragments (`value`/`word`/`collection`/`custom`/
//! `range`/`geospatial`), the `and`/`or`/`not` combinators, the top-level
//! `where` wrapper, and the combined-query envelope that pairs a structured
//! query with free text.
//!
//! Every type serializes to the backend's wire shape directly; there is no
//! separate encoding step. Fragment JSON is externally tagged by the
//! discriminating key (e.g. `range-constraint-query`), matching the shapes
//! the document-search backend accepts.

#![forbid(unsafe_code)]

pub mod combined;
pub mod fragment;
pub mod scalar;

pub use combined::{CombinedQuery, SearchEnvelope, WhereQuery, combined, where_query};
pub use fragment::{
    CollectionConstraintQuery, CustomConstraintQuery, GeospatialConstraintQuery, QueryFragment,
    QueryList, RangeConstraintQuery, TermConstraintQuery, and, collection_constraint,
    custom_constraint, custom_geospatial_constraint, geospatial_constraint, not, or,
    range_constraint, value_constraint, word_constraint,
};
pub use scalar::{GeoBox, RangeOperator, Scalar};
