//! A search provider for the Tavily search API.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::sync::Arc;

use async_trait::async_trait;
use mime::Mime;
use reqwest::{Client, StatusCode, header};
use search_agent_core::search::{
    SearchError, SearchErrorKind, SearchProvider, SearchResult,
};

pub use config::{SearchDepth, TavilyConfig, TavilyConfigBuilder};
use proto::{ErrorBody, SearchResponse};

fn error_from_reqwest(err: reqwest::Error) -> SearchError {
    let kind = if err.is_timeout() {
        SearchErrorKind::Timeout
    } else if err.is_connect() {
        SearchErrorKind::Unavailable
    } else {
        SearchErrorKind::Other
    };
    SearchError::new(kind, format!("{err}"))
}

/// Tavily search provider.
#[derive(Clone, Debug)]
pub struct TavilyProvider {
    client: Client,
    config: Arc<TavilyConfig>,
}

impl TavilyProvider {
    /// Creates a new `TavilyProvider` with the given configuration.
    #[inline]
    pub fn new(config: TavilyConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let req = proto::create_request(query, max_results, &self.config);
        let resp = self
            .client
            .post(format!("{}{}", self.config.base_url, "/search"))
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::ACCEPT, "application/json")
            .timeout(self.config.timeout)
            .json(&req)
            .send()
            .await
            .map_err(error_from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let is_json = content_type
            .and_then(|v| v.parse().ok())
            .map(|m: Mime| m.subtype().as_str() == "json")
            .unwrap_or(false);
        if !is_json {
            return Err(SearchError::new(
                SearchErrorKind::Other,
                format!("Unexpected content type: {content_type:?}"),
            ));
        }

        let body: SearchResponse = resp.json().await.map_err(|err| {
            SearchError::new(SearchErrorKind::Other, format!("{err}"))
        })?;
        let results = proto::convert_response(body);
        trace!("tavily returned {} result(s)", results.len());
        Ok(results)
    }
}

fn status_error(status: StatusCode, body: &str) -> SearchError {
    let kind = match status {
        StatusCode::TOO_MANY_REQUESTS => SearchErrorKind::RateLimitExceeded,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SearchErrorKind::Unauthorized
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            SearchErrorKind::Timeout
        }
        status if status.is_server_error() => SearchErrorKind::Unavailable,
        _ => SearchErrorKind::Other,
    };
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(ErrorBody::message)
        .unwrap_or_else(|_| body.to_owned());
    warn!("search request failed with {status}: {detail}");
    SearchError::new(kind, format!("{status}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_kinds() {
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":{"error":"Unauthorized: invalid API key."}}"#,
        );
        assert_eq!(err.kind(), SearchErrorKind::Unauthorized);
        assert!(!err.kind().is_transient());
        assert!(err.message().contains("invalid API key"));

        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.kind(), SearchErrorKind::RateLimitExceeded);
        assert!(err.kind().is_transient());

        let err = status_error(StatusCode::SERVICE_UNAVAILABLE, "down");
        assert_eq!(err.kind(), SearchErrorKind::Unavailable);
        assert!(err.message().ends_with("down"));

        let err = status_error(StatusCode::BAD_REQUEST, "bad");
        assert_eq!(err.kind(), SearchErrorKind::Other);
    }
}
