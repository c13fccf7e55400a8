use std::fmt::Debug;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How thoroughly Tavily searches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SearchDepth {
    /// Faster and cheaper.
    #[default]
    Basic,
    /// Slower, with more relevant excerpts.
    Advanced,
}

impl SearchDepth {
    #[inline]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

/// Builder for [`TavilyConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TavilyConfigBuilder {
    api_key: String,
    base_url: Option<String>,
    search_depth: SearchDepth,
    timeout: Option<Duration>,
}

impl TavilyConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            search_depth: SearchDepth::default(),
            timeout: None,
        }
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the search depth.
    #[inline]
    pub fn with_search_depth(mut self, search_depth: SearchDepth) -> Self {
        self.search_depth = search_depth;
        self
    }

    /// Sets how long a single HTTP request may take.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> TavilyConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        TavilyConfig {
            api_key: self.api_key,
            base_url: base_url.trim_end_matches('/').to_owned(),
            search_depth: self.search_depth,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

impl Debug for TavilyConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("base_url", &self.base_url)
            .field("search_depth", &self.search_depth)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Configuration for [`TavilyProvider`](crate::TavilyProvider).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TavilyConfig {
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) search_depth: SearchDepth,
    pub(crate) timeout: Duration,
}

impl Debug for TavilyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyConfig")
            .field("api_key", &"<deducted>")
            .field("base_url", &self.base_url)
            .field("search_depth", &self.search_depth)
            .field("timeout", &self.timeout)
            .finish()
    }
}
