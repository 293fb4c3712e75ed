//! Search session orchestration
//!
//! [`SearchContext`] owns the full client-side search state: free text,
//! 1-based paging, a registry of named [`Constraint`]s discovered from the
//! backend's option set, and the parameter-key configuration. It combines
//! active constraints into the backend query, executes search/suggest
//! calls through the [`SearchClient`] boundary, and converts the whole
//! state to and from a flat URL parameter map.
//!
//! Lifecycle: a context starts uninitialized; the first readiness wait
//! performs constraint discovery and the outcome sticks. A discovery
//! failure is cached and replayed on every later wait — it is never
//! retried on the same context.
//!
//! All mutation is synchronous and unguarded; a multi-threaded host must
//! serialize access itself.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use search_session_query as qb;
use search_session_query::{CombinedQuery, QueryFragment, WhereQuery};

use crate::client::{ClientResponse, SearchClient, SearchParams, SuggestParams};
use crate::constraint::{Constraint, TokenBundle};
use crate::error::{Result, SearchError};
use crate::params::{ConstraintCategory, LogicalParam, ParamsConfig, ParamsOptions};
use crate::response::{OptionsResponse, SearchResponse, SuggestResponse};
use crate::value::decode_component;

const DEFAULT_PAGE_LENGTH: u64 = 10;
const DEFAULT_QUERY_OPTIONS: &str = "all";

/// Options accepted by [`SearchContext::new`].
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub params: ParamsOptions,
    pub page_length: u64,
    pub search_transform: Option<String>,
    /// Backend option-set name used for discovery, search, and suggest.
    pub query_options: String,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            params: ParamsOptions::default(),
            page_length: DEFAULT_PAGE_LENGTH,
            search_transform: None,
            query_options: DEFAULT_QUERY_OPTIONS.to_string(),
        }
    }
}

/// One URL parameter value: a single string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    /// View the value as an ordered sequence; a single value is a
    /// one-element sequence.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

/// Flat URL parameter map, keyed by configured parameter keys.
pub type Params = IndexMap<String, ParamValue>;

/// Ad-hoc overrides spliced into the combined query before dispatch.
#[derive(Debug, Clone)]
pub enum AdhocQuery {
    /// Replace the whole `search` envelope.
    Search(Value),
    /// Replace the structured query inside the envelope.
    Query(Value),
    /// Replace the inline options inside the envelope.
    Options(Value),
}

fn apply_adhoc(query: &mut Value, adhoc: AdhocQuery) {
    match adhoc {
        AdhocQuery::Search(body) => {
            if let Some(object) = query.as_object_mut() {
                object.insert("search".to_string(), body);
            }
        }
        AdhocQuery::Query(inner) => {
            if let Some(search) = query.get_mut("search").and_then(Value::as_object_mut) {
                search.insert("query".to_string(), inner);
            }
        }
        AdhocQuery::Options(options) => {
            if let Some(search) = query.get_mut("search").and_then(Value::as_object_mut) {
                search.insert("options".to_string(), options);
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Lifecycle {
    Uninitialized,
    Ready,
    Failed(String),
}

/// A search session against one backend option set.
pub struct SearchContext {
    client: Arc<dyn SearchClient>,
    params_config: ParamsConfig,
    constraints: IndexMap<String, Constraint>,
    lifecycle: Lifecycle,
    qtext: String,
    start: u64,
    page_length: u64,
    search_transform: Option<String>,
    query_options: String,
}

impl SearchContext {
    /// Create an uninitialized session; constraint discovery runs on the
    /// first readiness wait.
    #[must_use]
    pub fn new(client: Arc<dyn SearchClient>, options: ContextOptions) -> Self {
        let page_length = if options.page_length == 0 {
            DEFAULT_PAGE_LENGTH
        } else {
            options.page_length
        };
        Self {
            client,
            params_config: ParamsConfig::new(&options.params),
            constraints: IndexMap::new(),
            lifecycle: Lifecycle::Uninitialized,
            qtext: String::new(),
            start: 1,
            page_length,
            search_transform: options.search_transform.filter(|t| !t.is_empty()),
            query_options: options.query_options,
        }
    }

    /// Wait until constraint discovery has completed.
    ///
    /// The first call performs discovery; later calls return the cached
    /// outcome. A cached failure is replayed, never retried.
    pub async fn ready(&mut self) -> Result<()> {
        match &self.lifecycle {
            Lifecycle::Ready => return Ok(()),
            Lifecycle::Failed(detail) => {
                return Err(SearchError::Lifecycle {
                    detail: detail.clone(),
                });
            }
            Lifecycle::Uninitialized => {}
        }
        match self.discover().await {
            Ok(()) => {
                self.lifecycle = Lifecycle::Ready;
                Ok(())
            }
            Err(err) => {
                let detail = err.to_string();
                warn!(error = %detail, "constraint discovery failed");
                self.lifecycle = Lifecycle::Failed(detail.clone());
                Err(SearchError::Lifecycle { detail })
            }
        }
    }

    async fn discover(&mut self) -> Result<()> {
        debug!(options = %self.query_options, "fetching constraint definitions");
        let response = self.client.options(&self.query_options).await?;
        if !response.ok() {
            return Err(SearchError::Backend {
                operation: "options",
            });
        }
        let parsed: OptionsResponse = response.json()?;
        for definition in &parsed.options.constraint {
            let constraint = Constraint::from_definition(definition)?;
            self.constraints
                .insert(constraint.name().to_string(), constraint);
        }
        debug!(count = self.constraints.len(), "constraint discovery complete");
        Ok(())
    }

    // ── Scalar state ────────────────────────────────────────────────────

    #[must_use]
    pub fn qtext(&self) -> &str {
        &self.qtext
    }

    pub fn set_qtext(&mut self, qtext: impl Into<String>) {
        self.qtext = qtext.into();
    }

    #[must_use]
    pub fn search_transform(&self) -> Option<&str> {
        self.search_transform.as_deref()
    }

    /// Set the named search transform; an empty name clears it.
    pub fn set_search_transform(&mut self, transform: Option<String>) {
        self.search_transform = transform.filter(|t| !t.is_empty());
    }

    #[must_use]
    pub fn query_options(&self) -> &str {
        &self.query_options
    }

    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub const fn page_length(&self) -> u64 {
        self.page_length
    }

    /// Set the page window size. A different value resets the position to
    /// page 1; reassigning the current value keeps the position. Zero
    /// restores the default length.
    pub fn set_page_length(&mut self, page_length: u64) {
        if self.page_length != page_length {
            self.page_length = if page_length == 0 {
                DEFAULT_PAGE_LENGTH
            } else {
                page_length
            };
            self.start = 1;
        }
    }

    /// Current 1-based page, derived from `start`.
    #[must_use]
    pub const fn page(&self) -> u64 {
        if self.page_length == 1 {
            self.start
        } else {
            self.start / self.page_length + 1
        }
    }

    /// Jump to a 1-based page; zero coerces to 1.
    pub fn set_page(&mut self, page: u64) {
        let page = if page == 0 { 1 } else { page };
        self.start = 1 + (page - 1) * self.page_length;
    }

    // ── Constraints ─────────────────────────────────────────────────────

    #[must_use]
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.get(name)
    }

    pub fn constraint_mut(&mut self, name: &str) -> Option<&mut Constraint> {
        self.constraints.get_mut(name)
    }

    /// All owned constraints, in discovery order.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    /// Owned constraints with at least one active value, in discovery
    /// order.
    pub fn active_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values().filter(|constraint| constraint.active())
    }

    // ── Query building ──────────────────────────────────────────────────

    /// Combine all active constraints into the top-level structured query.
    ///
    /// Geospatial fragments are partitioned out: zero contribute nothing,
    /// one is used as-is, several are OR-ed. The final term list is
    /// AND-wrapped only when it holds at least two terms.
    pub fn query(&self) -> Result<WhereQuery> {
        let mut queries: Vec<QueryFragment> = Vec::new();
        let mut geo_queries: Vec<QueryFragment> = Vec::new();

        for constraint in self.active_constraints() {
            if constraint.geospatial() {
                geo_queries.extend(constraint.queries()?);
            } else {
                queries.extend(constraint.queries()?);
            }
        }

        if geo_queries.len() == 1 {
            queries.extend(geo_queries);
        } else if geo_queries.len() > 1 {
            queries.push(qb::or(geo_queries));
        }

        let terms = if queries.len() > 1 {
            vec![qb::and(queries)]
        } else {
            queries
        };
        Ok(qb::where_query(terms))
    }

    /// The combined query: structured query plus current free text.
    pub fn combined_query(&self, options: Option<Value>) -> Result<CombinedQuery> {
        Ok(qb::combined(self.query()?, self.qtext.clone(), options))
    }

    // ── URL parameters ──────────────────────────────────────────────────

    /// Render the session state as a flat URL parameter map.
    ///
    /// Includes free text when non-empty, the page when beyond the first,
    /// and the concatenated per-category constraint entries — each only
    /// when its key is configured.
    #[must_use]
    pub fn params(&self) -> Params {
        let mut params = Params::new();

        if let Some(key) = self.params_config.key_for(LogicalParam::Qtext) {
            if !self.qtext.is_empty() {
                params.insert(key.to_string(), ParamValue::Single(self.qtext.clone()));
            }
        }
        if let Some(key) = self.params_config.key_for(LogicalParam::Page) {
            let page = self.page();
            if page > 1 {
                params.insert(key.to_string(), ParamValue::Single(page.to_string()));
            }
        }

        let mut lists: IndexMap<ConstraintCategory, Vec<String>> = IndexMap::new();
        for constraint in self.active_constraints() {
            let constraint_params = constraint.params(&self.params_config);
            for category in ConstraintCategory::ALL {
                let entries = constraint_params.get(category);
                if !entries.is_empty() {
                    lists
                        .entry(category)
                        .or_default()
                        .extend(entries.iter().cloned());
                }
            }
        }
        for category in ConstraintCategory::ALL {
            let Some(key) = self.params_config.key_for(category.logical()) else {
                continue;
            };
            if let Some(entries) = lists.swap_remove(&category) {
                params.insert(key.to_string(), ParamValue::Many(entries));
            }
        }

        params
    }

    /// Structural equality between the current state's parameters and an
    /// update: same key set, constraint categories compared as
    /// order-sensitive sequences, everything else by strict equality.
    #[must_use]
    pub fn params_equal(&self, update: &Params) -> bool {
        let params = self.params();
        if params.len() != update.len() {
            return false;
        }
        for (key, ours) in &params {
            let Some(theirs) = update.get(key) else {
                return false;
            };
            if ours == theirs {
                continue;
            }
            if !self.params_config.constraint_keys().contains(key) {
                return false;
            }
            if ours.as_slice() != theirs.as_slice() {
                return false;
            }
        }
        true
    }

    /// Apply a URL parameter update.
    ///
    /// Returns `false` without touching anything when the update equals
    /// the current parameters. The constraint entries are validated in
    /// full — split shape and constraint ownership — before any state
    /// changes; each constraint is then cleared and repopulated
    /// atomically relative to itself.
    pub fn from_params(&mut self, update: &Params) -> Result<bool> {
        if self.params_equal(update) {
            return Ok(false);
        }

        let separator = self.params_config.separator().to_string();
        let mut bundles: IndexMap<String, TokenBundle> = IndexMap::new();
        for category in ConstraintCategory::ALL {
            let Some(key) = self.params_config.key_for(category.logical()) else {
                continue;
            };
            let Some(value) = update.get(key) else {
                continue;
            };
            for param in value.as_slice() {
                let (name, token) = split_constraint_param(param, &separator)?;
                if !self.constraints.contains_key(&name) {
                    return Err(SearchError::MissingConstraint { name });
                }
                bundles.entry(name).or_default().push(category, token);
            }
        }

        if let Some(key) = self.params_config.key_for(LogicalParam::Qtext) {
            self.qtext = match update.get(key) {
                Some(ParamValue::Single(qtext)) => qtext.clone(),
                Some(ParamValue::Many(_)) | None => String::new(),
            };
        }
        if let Some(key) = self.params_config.key_for(LogicalParam::Page) {
            let page = match update.get(key) {
                Some(ParamValue::Single(raw)) => raw.parse::<u64>().unwrap_or(1),
                Some(ParamValue::Many(_)) | None => 1,
            };
            self.set_page(page);
        }

        for (name, constraint) in &mut self.constraints {
            constraint.from_params(bundles.get(name))?;
        }

        Ok(true)
    }

    // ── Backend calls ───────────────────────────────────────────────────

    /// Execute a search for the current state.
    ///
    /// Awaits readiness, dispatches the combined query with the session's
    /// windowing parameters, and attaches each returned facet to its
    /// constraint. Facet names with no matching constraint are ignored.
    pub async fn search(&mut self, adhoc: Option<AdhocQuery>) -> Result<SearchResponse> {
        self.ready().await?;

        let mut query = self.combined_query(None)?.into_value()?;
        if let Some(adhoc) = adhoc {
            apply_adhoc(&mut query, adhoc);
        }
        let params = SearchParams {
            start: self.start,
            page_length: self.page_length,
            transform: self.search_transform.clone(),
            options: Some(self.query_options.clone()),
        };

        debug!(start = self.start, page_length = self.page_length, "dispatching search");
        let response = self.client.search(&query, &params).await?;
        let results = Self::parse_response::<SearchResponse>(&response, "search")?;

        for (name, facet) in &results.facets {
            if let Some(constraint) = self.constraints.get_mut(name) {
                constraint.set_facet(Some(facet.clone()));
            }
        }

        Ok(results)
    }

    /// Fetch term suggestions for partial query text, scoped by the
    /// current constraint state.
    pub async fn suggest(&mut self, qtext: &str, adhoc: Option<AdhocQuery>) -> Result<Vec<String>> {
        self.ready().await?;

        let mut query = self.combined_query(None)?.into_value()?;
        if let Some(adhoc) = adhoc {
            apply_adhoc(&mut query, adhoc);
        }
        let params = SuggestParams {
            options: Some(self.query_options.clone()),
        };

        debug!(qtext, "dispatching suggest");
        let response = self.client.suggest(qtext, &query, &params).await?;
        let parsed = Self::parse_response::<SuggestResponse>(&response, "suggest")?;
        Ok(parsed.suggestions)
    }

    fn parse_response<T: serde::de::DeserializeOwned>(
        response: &ClientResponse,
        operation: &'static str,
    ) -> Result<T> {
        if !response.ok() {
            warn!(status = response.status(), operation, "backend request failed");
            return Err(SearchError::Backend { operation });
        }
        response.json()
    }
}

fn split_constraint_param(param: &str, separator: &str) -> Result<(String, String)> {
    let bad_param = || SearchError::BadConstraintParam {
        param: param.to_string(),
    };

    // The separator must appear, and not at the start.
    match param.find(separator) {
        None | Some(0) => return Err(bad_param()),
        Some(_) => {}
    }
    let parts: Vec<&str> = param
        .split(separator)
        .filter(|part| !part.is_empty())
        .collect();
    let [name, token] = <[&str; 2]>::try_from(parts).map_err(|_| bad_param())?;
    let name = decode_component(name).ok_or_else(bad_param)?;
    Ok((name, token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintKind;
    use crate::params::KeyOverride;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // Scripted client double: queued responses per operation, recorded
    // calls for assertions.
    #[derive(Default)]
    struct StubClient {
        options_responses: Mutex<VecDeque<ClientResponse>>,
        search_responses: Mutex<VecDeque<ClientResponse>>,
        suggest_responses: Mutex<VecDeque<ClientResponse>>,
        search_calls: Mutex<Vec<(Value, u64, u64, Option<String>)>>,
        suggest_calls: Mutex<Vec<(String, Value)>>,
    }

    impl StubClient {
        fn with_constraints(definitions: Value) -> Arc<Self> {
            let stub = Self::default();
            stub.push_options(ClientResponse::new(
                200,
                json!({"options": {"constraint": definitions}}),
            ));
            Arc::new(stub)
        }

        fn push_options(&self, response: ClientResponse) {
            self.options_responses.lock().unwrap().push_back(response);
        }

        fn push_search(&self, response: ClientResponse) {
            self.search_responses.lock().unwrap().push_back(response);
        }

        fn push_suggest(&self, response: ClientResponse) {
            self.suggest_responses.lock().unwrap().push_back(response);
        }
    }

    #[async_trait]
    impl SearchClient for StubClient {
        async fn options(&self, _name: &str) -> Result<ClientResponse> {
            self.options_responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(SearchError::Backend {
                    operation: "options",
                })
        }

        async fn search(&self, query: &Value, params: &SearchParams) -> Result<ClientResponse> {
            self.search_calls.lock().unwrap().push((
                query.clone(),
                params.start,
                params.page_length,
                params.options.clone(),
            ));
            self.search_responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(SearchError::Backend {
                    operation: "search",
                })
        }

        async fn suggest(
            &self,
            qtext: &str,
            query: &Value,
            _params: &SuggestParams,
        ) -> Result<ClientResponse> {
            self.suggest_calls
                .lock()
                .unwrap()
                .push((qtext.to_string(), query.clone()));
            self.suggest_responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(SearchError::Backend {
                    operation: "suggest",
                })
        }
    }

    fn definitions() -> Value {
        json!([
            {"name": "genre", "word": {"element": {"name": "genre"}}},
            {"name": "price", "range": {"type": "xs:int", "element": {"name": "price"}}},
            {"name": "region", "geo-elem": {"element": {"name": "region"}}},
            {"name": "area", "custom": {"parse": {"apply": "area"}},
             "annotation": [{"geo-elem-pair": {}}]},
        ])
    }

    async fn ready_context() -> SearchContext {
        let client = StubClient::with_constraints(definitions());
        let mut context = SearchContext::new(client, ContextOptions::default());
        context.ready().await.unwrap();
        context
    }

    fn empty_context() -> SearchContext {
        SearchContext::new(Arc::new(StubClient::default()), ContextOptions::default())
    }

    #[test]
    fn paging_math() {
        let mut context = empty_context();
        assert_eq!(context.page(), 1);
        assert_eq!(context.start(), 1);
        assert_eq!(context.page_length(), 10);

        context.set_page(0);
        assert_eq!(context.page(), 1);

        context.set_page(4);
        assert_eq!(context.page(), 4);
        assert_eq!(context.start(), 31);

        context.set_page_length(20);
        assert_eq!(context.page_length(), 20);
        assert_eq!(context.page(), 1);

        context.set_page(9);
        assert_eq!(context.start(), 161);

        context.set_page_length(0);
        assert_eq!(context.page_length(), 10);
        assert_eq!(context.page(), 1);
    }

    #[test]
    fn page_equals_start_when_page_length_is_one() {
        let mut context = empty_context();
        context.set_page_length(1);
        for page in [1, 2, 5, 42] {
            context.set_page(page);
            assert_eq!(context.start(), page);
            assert_eq!(context.page(), page);
        }
    }

    #[test]
    fn reassigning_the_same_page_length_keeps_the_position() {
        let mut context = empty_context();
        context.set_page_length(18);
        context.set_page(7);
        assert_eq!(context.start(), 109);

        context.set_page_length(18);
        assert_eq!(context.page(), 7);
        assert_eq!(context.start(), 109);
    }

    #[test]
    fn qtext_and_transform_setters() {
        let mut context = empty_context();
        assert_eq!(context.qtext(), "");

        context.set_qtext("test");
        assert_eq!(context.qtext(), "test");

        context.set_search_transform(Some("shape".to_string()));
        assert_eq!(context.search_transform(), Some("shape"));

        context.set_search_transform(Some(String::new()));
        assert_eq!(context.search_transform(), None);
    }

    #[tokio::test]
    async fn discovery_builds_the_constraint_registry() {
        let context = ready_context().await;
        assert_eq!(context.constraints().count(), 4);
        assert_eq!(
            context.constraint("genre").unwrap().kind(),
            ConstraintKind::Word
        );
        assert_eq!(
            context.constraint("price").unwrap().kind(),
            ConstraintKind::Range
        );
        assert_eq!(
            context.constraint("region").unwrap().kind(),
            ConstraintKind::Geospatial
        );
        assert_eq!(
            context.constraint("area").unwrap().kind(),
            ConstraintKind::CustomGeospatial
        );
    }

    #[tokio::test]
    async fn discovery_failure_is_cached_and_replayed() {
        let client = Arc::new(StubClient::default());
        let mut context = SearchContext::new(Arc::clone(&client) as Arc<dyn SearchClient>, ContextOptions::default());

        let err = context.ready().await.unwrap_err();
        assert_eq!(err.error_type(), "LIFECYCLE_FAILURE");

        // A good response arriving later must not be consumed: the cached
        // failure replays instead of retrying discovery.
        client.push_options(ClientResponse::new(
            200,
            json!({"options": {"constraint": []}}),
        ));
        let err = context.ready().await.unwrap_err();
        assert_eq!(err.error_type(), "LIFECYCLE_FAILURE");
        assert_eq!(client.options_responses.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_propagates_cached_lifecycle_failure() {
        let mut context = SearchContext::new(
            Arc::new(StubClient::default()),
            ContextOptions::default(),
        );
        assert!(context.ready().await.is_err());
        let err = context.search(None).await.unwrap_err();
        assert_eq!(err.error_type(), "LIFECYCLE_FAILURE");
    }

    #[tokio::test]
    async fn empty_state_builds_an_empty_where_query() {
        let context = ready_context().await;
        let query = context.query().unwrap();
        assert!(query.is_empty());
        assert_eq!(
            serde_json::to_value(query).unwrap(),
            json!({"query": {"queries": []}})
        );
    }

    #[tokio::test]
    async fn single_term_is_not_wrapped_in_and() {
        let mut context = ready_context().await;
        context
            .constraint_mut("genre")
            .unwrap()
            .match_values(&json!({"value": "fiction"}))
            .unwrap();
        let value = serde_json::to_value(context.query().unwrap()).unwrap();
        let queries = value["query"]["queries"].as_array().unwrap();
        assert_eq!(queries.len(), 1);
        assert!(queries[0]["word-constraint-query"].is_object());
    }

    #[tokio::test]
    async fn multiple_terms_are_and_wrapped() {
        let mut context = ready_context().await;
        context
            .constraint_mut("genre")
            .unwrap()
            .match_values(&json!({"value": "fiction"}))
            .unwrap();
        context
            .constraint_mut("price")
            .unwrap()
            .match_values(&json!({"min": 3, "max": 10}))
            .unwrap();
        let value = serde_json::to_value(context.query().unwrap()).unwrap();
        let queries = value["query"]["queries"].as_array().unwrap();
        assert_eq!(queries.len(), 1);
        let and_terms = queries[0]["and-query"]["queries"].as_array().unwrap();
        // word + range lower bound + range upper bound
        assert_eq!(and_terms.len(), 3);
    }

    #[tokio::test]
    async fn single_geospatial_fragment_is_used_as_is() {
        let mut context = ready_context().await;
        context
            .constraint_mut("region")
            .unwrap()
            .match_values(&json!({"north": 30, "south": 25, "east": -75, "west": -80}))
            .unwrap();
        let value = serde_json::to_value(context.query().unwrap()).unwrap();
        let queries = value["query"]["queries"].as_array().unwrap();
        assert_eq!(queries.len(), 1);
        assert!(queries[0]["geospatial-constraint-query"].is_object());
    }

    #[tokio::test]
    async fn multiple_geospatial_fragments_are_or_combined() {
        let mut context = ready_context().await;
        context
            .constraint_mut("region")
            .unwrap()
            .match_values(&json!({"n": 30, "s": 25, "e": -75, "w": -80}))
            .unwrap();
        context
            .constraint_mut("area")
            .unwrap()
            .match_values(&json!({"n": 3, "s": 1, "e": 4, "w": 2}))
            .unwrap();
        context
            .constraint_mut("genre")
            .unwrap()
            .match_values(&json!({"value": "fiction"}))
            .unwrap();

        let value = serde_json::to_value(context.query().unwrap()).unwrap();
        let and_terms = value["query"]["queries"][0]["and-query"]["queries"]
            .as_array()
            .unwrap();
        assert_eq!(and_terms.len(), 2);
        assert!(and_terms[0]["word-constraint-query"].is_object());
        let geo_terms = and_terms[1]["or-query"]["queries"].as_array().unwrap();
        assert_eq!(geo_terms.len(), 2);
        assert!(geo_terms[0]["geospatial-constraint-query"].is_object());
        assert!(geo_terms[1]["custom-constraint-query"].is_object());
    }

    #[tokio::test]
    async fn combined_query_carries_qtext() {
        let mut context = ready_context().await;
        context.set_qtext("whales");
        let value = context.combined_query(None).unwrap().into_value().unwrap();
        assert_eq!(value["search"]["qtext"], json!("whales"));
    }

    #[tokio::test]
    async fn params_render_active_state() {
        let mut context = ready_context().await;
        context.set_qtext("whales");
        context.set_page(4);
        context
            .constraint_mut("genre")
            .unwrap()
            .match_values(&json!({"value": "fiction"}))
            .unwrap();
        context
            .constraint_mut("price")
            .unwrap()
            .match_any(&json!({"min": 3, "max": 10}))
            .unwrap();
        context
            .constraint_mut("genre")
            .unwrap()
            .exclude(&json!({"value": "romance"}))
            .unwrap();

        let params = context.params();
        assert_eq!(params.get("q"), Some(&ParamValue::Single("whales".to_string())));
        assert_eq!(params.get("p"), Some(&ParamValue::Single("4".to_string())));
        assert_eq!(
            params.get("c"),
            Some(&ParamValue::Many(vec!["genre:fiction".to_string()]))
        );
        assert_eq!(
            params.get("o"),
            Some(&ParamValue::Many(vec!["price:3_10".to_string()]))
        );
        assert_eq!(
            params.get("n"),
            Some(&ParamValue::Many(vec!["genre:romance".to_string()]))
        );
    }

    #[tokio::test]
    async fn default_state_renders_no_params() {
        let context = ready_context().await;
        assert!(context.params().is_empty());
    }

    #[tokio::test]
    async fn page_one_is_omitted_from_params() {
        let mut context = ready_context().await;
        context.set_qtext("x");
        context.set_page(1);
        assert!(!context.params().contains_key("p"));
    }

    #[tokio::test]
    async fn disabled_page_key_is_never_rendered() {
        let client = StubClient::with_constraints(definitions());
        let options = ContextOptions {
            params: ParamsOptions {
                page: KeyOverride::Disabled,
                ..ParamsOptions::default()
            },
            ..ContextOptions::default()
        };
        let mut context = SearchContext::new(client, options);
        context.ready().await.unwrap();
        context.set_page(7);
        context.set_qtext("x");
        let params = context.params();
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("q"));
    }

    #[tokio::test]
    async fn from_params_is_a_fixed_point() {
        let mut context = ready_context().await;
        context.set_qtext("whales");
        context.set_page(3);
        context
            .constraint_mut("genre")
            .unwrap()
            .match_values(&json!({"value": "fiction"}))
            .unwrap();

        let params = context.params();
        assert!(!context.from_params(&params).unwrap());
        assert!(context.params_equal(&params));
    }

    #[tokio::test]
    async fn from_params_applies_an_update() {
        let mut context = ready_context().await;
        let mut update = Params::new();
        update.insert("q".to_string(), ParamValue::from("whales"));
        update.insert("p".to_string(), ParamValue::from("4"));
        update.insert(
            "c".to_string(),
            ParamValue::Many(vec!["genre:fiction".to_string(), "price:3_10".to_string()]),
        );
        update.insert(
            "n".to_string(),
            ParamValue::Many(vec!["genre:romance".to_string()]),
        );

        assert!(context.from_params(&update).unwrap());
        assert_eq!(context.qtext(), "whales");
        assert_eq!(context.page(), 4);
        assert_eq!(context.constraint("genre").unwrap().every().len(), 1);
        assert_eq!(context.constraint("genre").unwrap().none().len(), 1);
        assert_eq!(context.constraint("price").unwrap().every().len(), 1);
        assert!(context.params_equal(&update));
    }

    #[tokio::test]
    async fn from_params_clears_unmentioned_constraints() {
        let mut context = ready_context().await;
        context
            .constraint_mut("genre")
            .unwrap()
            .match_values(&json!({"value": "fiction"}))
            .unwrap();

        let mut update = Params::new();
        update.insert(
            "c".to_string(),
            ParamValue::Many(vec!["price:3_".to_string()]),
        );
        assert!(context.from_params(&update).unwrap());
        assert!(!context.constraint("genre").unwrap().active());
        assert!(context.constraint("price").unwrap().active());
    }

    #[tokio::test]
    async fn from_params_rejects_malformed_entries() {
        let mut context = ready_context().await;
        for bad in ["noseparator", ":leading", "a:b:c", "genre:"] {
            let mut update = Params::new();
            update.insert("c".to_string(), ParamValue::Many(vec![bad.to_string()]));
            let err = context.from_params(&update).unwrap_err();
            assert_eq!(err.error_type(), "BAD_CONSTRAINT_PARAM", "param: {bad}");
        }
    }

    #[tokio::test]
    async fn from_params_rejects_unknown_constraints_before_mutating() {
        let mut context = ready_context().await;
        context.set_qtext("before");

        let mut update = Params::new();
        update.insert("q".to_string(), ParamValue::from("after"));
        update.insert(
            "c".to_string(),
            ParamValue::Many(vec!["ghost:blah".to_string()]),
        );
        let err = context.from_params(&update).unwrap_err();
        assert_eq!(err.error_type(), "MISSING_CONSTRAINT");
        assert_eq!(context.qtext(), "before");
    }

    #[tokio::test]
    async fn params_equal_treats_single_as_one_element_sequence() {
        let mut context = ready_context().await;
        context
            .constraint_mut("genre")
            .unwrap()
            .match_values(&json!({"value": "fiction"}))
            .unwrap();

        let mut update = Params::new();
        update.insert("c".to_string(), ParamValue::from("genre:fiction"));
        assert!(context.params_equal(&update));
    }

    #[tokio::test]
    async fn search_forwards_state_and_attaches_facets() {
        let client = StubClient::with_constraints(definitions());
        client.push_search(ClientResponse::new(
            200,
            json!({
                "results": [{"uri": "/doc/1.json"}],
                "facets": {
                    "genre": {
                        "type": "xs:string",
                        "facetValues": [{"name": "fiction", "count": 12, "value": "fiction"}]
                    },
                    "unknown": {"facetValues": []}
                }
            }),
        ));
        let mut context = SearchContext::new(
            Arc::clone(&client) as Arc<dyn SearchClient>,
            ContextOptions::default(),
        );
        context.set_qtext("whales");
        context.set_page(4);

        let results = context.search(None).await.unwrap();
        assert_eq!(results.results.len(), 1);

        let calls = client.search_calls.lock().unwrap();
        let (query, start, page_length, options) = &calls[0];
        assert_eq!(*start, 31);
        assert_eq!(*page_length, 10);
        assert_eq!(options.as_deref(), Some("all"));
        assert_eq!(query["search"]["qtext"], json!("whales"));

        let facet = context.constraint("genre").unwrap().facet().unwrap();
        assert_eq!(facet.facet_values[0].count, 12);
    }

    #[tokio::test]
    async fn search_maps_non_ok_responses_to_backend_failure() {
        let client = StubClient::with_constraints(definitions());
        client.push_search(ClientResponse::new(500, json!({"error": "boom"})));
        let mut context = SearchContext::new(
            Arc::clone(&client) as Arc<dyn SearchClient>,
            ContextOptions::default(),
        );
        let err = context.search(None).await.unwrap_err();
        assert_eq!(err.error_type(), "BACKEND_FAILURE");
    }

    #[tokio::test]
    async fn adhoc_options_replace_the_inline_options() {
        let client = StubClient::with_constraints(definitions());
        client.push_search(ClientResponse::new(200, json!({"results": [], "facets": {}})));
        let mut context = SearchContext::new(
            Arc::clone(&client) as Arc<dyn SearchClient>,
            ContextOptions::default(),
        );
        context
            .search(Some(AdhocQuery::Options(json!({"debug": true}))))
            .await
            .unwrap();

        let calls = client.search_calls.lock().unwrap();
        assert_eq!(calls[0].0["search"]["options"], json!({"debug": true}));
    }

    #[tokio::test]
    async fn adhoc_search_replaces_the_whole_envelope() {
        let client = StubClient::with_constraints(definitions());
        client.push_search(ClientResponse::new(200, json!({"results": [], "facets": {}})));
        let mut context = SearchContext::new(
            Arc::clone(&client) as Arc<dyn SearchClient>,
            ContextOptions::default(),
        );
        context.set_qtext("ignored");
        context
            .search(Some(AdhocQuery::Search(json!({"qtext": "override"}))))
            .await
            .unwrap();

        let calls = client.search_calls.lock().unwrap();
        assert_eq!(calls[0].0["search"], json!({"qtext": "override"}));
    }

    #[tokio::test]
    async fn adhoc_query_replaces_the_structured_query() {
        let client = StubClient::with_constraints(definitions());
        client.push_search(ClientResponse::new(200, json!({"results": [], "facets": {}})));
        let mut context = SearchContext::new(
            Arc::clone(&client) as Arc<dyn SearchClient>,
            ContextOptions::default(),
        );
        context
            .search(Some(AdhocQuery::Query(json!({"queries": [{"custom": 1}]}))))
            .await
            .unwrap();

        let calls = client.search_calls.lock().unwrap();
        assert_eq!(calls[0].0["search"]["query"], json!({"queries": [{"custom": 1}]}));
    }

    #[tokio::test]
    async fn suggest_returns_the_suggestion_list() {
        let client = StubClient::with_constraints(definitions());
        client.push_suggest(ClientResponse::new(
            200,
            json!({"suggestions": ["whale", "whaler"]}),
        ));
        let mut context = SearchContext::new(
            Arc::clone(&client) as Arc<dyn SearchClient>,
            ContextOptions::default(),
        );
        let suggestions = context.suggest("wha", None).await.unwrap();
        assert_eq!(suggestions, vec!["whale", "whaler"]);

        let calls = client.suggest_calls.lock().unwrap();
        assert_eq!(calls[0].0, "wha");
    }

    #[tokio::test]
    async fn suggest_defaults_to_empty_list() {
        let client = StubClient::with_constraints(definitions());
        client.push_suggest(ClientResponse::new(200, json!({})));
        let mut context = SearchContext::new(
            Arc::clone(&client) as Arc<dyn SearchClient>,
            ContextOptions::default(),
        );
        assert!(context.suggest("wha", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn suggest_maps_non_ok_responses_to_backend_failure() {
        let client = StubClient::with_constraints(definitions());
        client.push_suggest(ClientResponse::new(503, json!({})));
        let mut context = SearchContext::new(
            Arc::clone(&client) as Arc<dyn SearchClient>,
            ContextOptions::default(),
        );
        let err = context.suggest("wha", None).await.unwrap_err();
        assert_eq!(err.error_type(), "BACKEND_FAILURE");
    }
}
