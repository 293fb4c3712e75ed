//! Top-level query wrappers
//!
//! A [`WhereQuery`] is the `{"query": {"queries": [...]}}` shape a search
//! endpoint accepts as its structured query; a [`CombinedQuery`] pairs that
//! structured query with free text (and optional inline options) under a
//! `search` envelope.

use serde::{Deserialize, Serialize};

use crate::fragment::{QueryFragment, QueryList};

/// Top-level structured query: `{"query": {"queries": [...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhereQuery {
    pub query: QueryList,
}

impl WhereQuery {
    /// Returns `true` if the query carries no fragments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.queries.is_empty()
    }
}

/// Wrap fragments as a top-level structured query.
///
/// The fragment list is taken as-is: callers decide whether multiple terms
/// are pre-combined with `and`/`or`, and a single term is never wrapped.
#[must_use]
pub fn where_query(fragments: Vec<QueryFragment>) -> WhereQuery {
    WhereQuery {
        query: QueryList { queries: fragments },
    }
}

/// Combined query envelope: structured query plus free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedQuery {
    pub search: SearchEnvelope,
}

/// Body of the `search` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEnvelope {
    pub query: QueryList,
    pub qtext: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl CombinedQuery {
    /// Convert to a raw JSON value, e.g. for ad-hoc envelope splicing.
    pub fn into_value(self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Merge a structured query and free text into the combined envelope.
#[must_use]
pub fn combined(
    query: WhereQuery,
    qtext: impl Into<String>,
    options: Option<serde_json::Value>,
) -> CombinedQuery {
    CombinedQuery {
        search: SearchEnvelope {
            query: query.query,
            qtext: qtext.into(),
            options,
        },
    }
}
