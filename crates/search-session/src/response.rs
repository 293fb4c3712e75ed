//! Typed backend response models
//!
//! Only the shapes the session consumes are declared; anything else the
//! backend returns rides along in the `extra` maps untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response to an option-set fetch: `{"options": {"constraint": [...]}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsResponse {
    pub options: OptionsBody,
}

/// The `options` node of an option-set response.
///
/// Constraint definitions stay untyped here; classification happens in
/// [`crate::constraint::ConstraintKind::classify`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsBody {
    #[serde(default)]
    pub constraint: Vec<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Response to a search call: result rows plus per-constraint facets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub facets: IndexMap<String, FacetResult>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Aggregation data the backend returns for one constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacetResult {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "facetValues", default)]
    pub facet_values: Vec<FacetValue>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One facet bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetValue {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub value: Value,
}

/// Response to a suggest call; `suggestions` defaults to empty when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestResponse {
    #[serde(default)]
    pub suggestions: Vec<String>,
}
