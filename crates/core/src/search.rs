//! Web search: result records, the provider abstraction and the search tool.

use std::fmt::{self, Display};
use std::sync::Arc;

use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

use crate::retry::{RetryPolicy, retry};
use crate::tool::{Error as ToolError, Tool, ToolResult};

/// The number of results requested from the search provider.
pub const MAX_RESULTS: usize = 5;

/// Placeholder shown for a result without a URL.
pub const NO_URL: &str = "No URL available";

/// Placeholder shown for a result without an excerpt.
pub const NO_CONTENT: &str = "No content available";

/// A single search result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the page, if the provider knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Address of the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Text excerpt of the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl SearchResult {
    /// Returns the URL, or a placeholder if there is none.
    #[inline]
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(NO_URL)
    }

    /// Returns the excerpt, or a placeholder if there is none.
    #[inline]
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or(NO_CONTENT)
    }
}

/// Recovers the results from an observation produced by [`SearchTool`].
///
/// Returns `None` if the observation is not a serialized result list.
pub fn parse_observation(observation: &str) -> Option<Vec<SearchResult>> {
    serde_json::from_str(observation).ok()
}

/// The kind of a search failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchErrorKind {
    /// The provider is rate limited.
    RateLimitExceeded,
    /// The request did not finish in time.
    Timeout,
    /// The provider is temporarily unavailable.
    Unavailable,
    /// The credentials were rejected.
    Unauthorized,
    /// Any other errors.
    Other,
}

impl SearchErrorKind {
    /// Returns `true` if the failed search may succeed later.
    #[inline]
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            SearchErrorKind::RateLimitExceeded
                | SearchErrorKind::Timeout
                | SearchErrorKind::Unavailable
        )
    }
}

/// Describes a search failure.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SearchError {
    kind: SearchErrorKind,
    message: String,
}

impl SearchError {
    /// Creates a new error.
    #[inline]
    pub fn new<S: Into<String>>(kind: SearchErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> SearchErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "search failed ({:?}): {}", self.kind, self.message)
    }
}

impl std::error::Error for SearchError {}

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Searches for `query`, returning at most `max_results` results in
    /// ranking order.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

#[async_trait]
impl<T: SearchProvider + ?Sized> SearchProvider for Arc<T> {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        (**self).search(query, max_results).await
    }
}

/// A shareable handle to a search provider that applies the retry policy
/// and the result cap.
#[derive(Clone)]
pub struct SearchClient {
    provider: Arc<dyn SearchProvider>,
    retry_policy: RetryPolicy,
    max_results: usize,
}

impl SearchClient {
    /// Creates a client with the default retry policy.
    #[inline]
    pub fn new<P: SearchProvider + 'static>(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            retry_policy: RetryPolicy::default(),
            max_results: MAX_RESULTS,
        }
    }

    /// Replaces the retry policy.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Searches for `query`.
    ///
    /// Never returns more than [`MAX_RESULTS`] results, even if the provider
    /// ignores the limit.
    pub async fn search(
        &self,
        query: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let span = debug_span!("search", query);
        async {
            let mut results = retry(
                &self.retry_policy,
                || self.provider.search(query, self.max_results),
                |err: &SearchError| err.kind().is_transient(),
                |limit| {
                    SearchError::new(
                        SearchErrorKind::Timeout,
                        format!("no response after {limit:?}"),
                    )
                },
            )
            .await?;
            results.truncate(self.max_results);
            debug!("got {} result(s)", results.len());
            Ok(results)
        }
        .instrument(span)
        .await
    }
}

/// Input of [`SearchTool`].
#[derive(Deserialize, JsonSchema)]
pub struct SearchToolParameters {
    #[schemars(description = "The search query.")]
    query: String,
}

/// The web search tool offered to the agent.
///
/// Its observation is the JSON-encoded result list, which
/// [`parse_observation`] turns back into [`SearchResult`]s.
pub struct SearchTool {
    client: SearchClient,
    parameter_schema: Value,
}

impl SearchTool {
    /// The name the model uses to call this tool.
    pub const NAME: &'static str = "tavily_search_results_json";

    /// Creates a search tool backed by `client`.
    #[inline]
    pub fn new(client: SearchClient) -> Self {
        SearchTool {
            client,
            parameter_schema: schema_for!(SearchToolParameters).to_value(),
        }
    }
}

impl Tool for SearchTool {
    type Input = SearchToolParameters;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        r#"
A search engine optimized for comprehensive, accurate, and trusted results.
Useful for when you need to answer questions about current events.
Input should be a search query."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SearchToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            if input.query.trim().is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`query` must not be empty"));
            }
            let results = client.search(&input.query).await.map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })?;
            serde_json::to_string(&results).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}
