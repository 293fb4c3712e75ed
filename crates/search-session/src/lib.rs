//! Client-side faceted-search state management
//!
//! This crate translates user-facing search criteria — free text, paged
//! navigation, and faceted constraints (value, word, collection, custom,
//! range, and geospatial filters) — into structured query objects for a
//! document-search backend, and serializes that state to and from flat
//! URL-style parameter maps, reversibly.
//!
//! The moving parts, leaf first:
//! - [`value::ConstraintValue`] — one filter datum (scalar, range, or
//!   bounding box) with a compact URL token codec
//! - [`builder`] — pure compilation of constraint values into backend
//!   query fragments
//! - [`constraint::Constraint`] — a named filter with AND/OR/NOT value
//!   sets
//! - [`params::ParamsConfig`] — logical parameter names ↔ URL keys
//! - [`context::SearchContext`] — the session: discovery, query
//!   combination, search/suggest dispatch, parameter round-tripping
//!
//! The backend itself sits behind [`client::SearchClient`]; transport and
//! retry are the implementor's concern.

#![forbid(unsafe_code)]

pub mod builder;
pub mod client;
pub mod constraint;
pub mod context;
pub mod error;
pub mod params;
pub mod response;
pub mod value;

// Re-export key types for convenience
pub use client::{ClientResponse, SearchClient, SearchParams, SuggestParams};
pub use constraint::{Constraint, ConstraintKind, ConstraintParams, TokenBundle};
pub use context::{AdhocQuery, ContextOptions, ParamValue, Params, SearchContext};
pub use error::{Result, SearchError};
pub use params::{ConstraintCategory, KeyOverride, LogicalParam, ParamsConfig, ParamsOptions};
pub use response::{FacetResult, FacetValue, OptionsResponse, SearchResponse, SuggestResponse};
pub use value::{ConstraintValue, ValueId, ValueKind, ValueSet};

// The fragment vocabulary is part of the public surface.
pub use search_session_query::{
    CombinedQuery, GeoBox, QueryFragment, RangeOperator, Scalar, WhereQuery,
};
