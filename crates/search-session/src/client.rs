//! Backend search client boundary
//!
//! The session consumes exactly three backend capabilities — option-set
//! discovery, search, and suggest — behind [`SearchClient`]. Transport,
//! authentication, and retry live entirely on the implementor's side;
//! the session sees status plus JSON body and nothing else.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SearchError};

/// A backend response: HTTP-ish status plus parsed JSON body.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    status: u16,
    body: Value,
}

impl ClientResponse {
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is in the success range.
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Deserialize the body into a declared response shape.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|err| SearchError::InvalidResponse {
            detail: err.to_string(),
        })
    }
}

/// Windowing and transform parameters forwarded with a search call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// 1-based index of the first result.
    pub start: u64,
    pub page_length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    /// Backend option-set name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

/// Parameters forwarded with a suggest call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuggestParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

/// The consumed backend-search capability.
///
/// Implementations must surface transport failures as
/// [`SearchError::Backend`]; non-2xx responses are returned as-is and
/// classified by the session.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetch an option set by name.
    async fn options(&self, name: &str) -> Result<ClientResponse>;

    /// Execute a combined search query.
    async fn search(&self, query: &Value, params: &SearchParams) -> Result<ClientResponse>;

    /// Fetch term suggestions for partial query text.
    async fn suggest(
        &self,
        qtext: &str,
        query: &Value,
        params: &SuggestParams,
    ) -> Result<ClientResponse>;
}
