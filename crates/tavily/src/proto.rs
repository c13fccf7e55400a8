use search_agent_core::search::SearchResult;
use serde::{Deserialize, Serialize};

use crate::TavilyConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[inline]
pub fn create_request<'a>(
    query: &'a str,
    max_results: usize,
    config: &TavilyConfig,
) -> SearchRequest<'a> {
    SearchRequest {
        query,
        max_results,
        search_depth: config.search_depth.as_str(),
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<ResultItem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ResultItem {
    pub title: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Detail { detail: ErrorDetail },
    Flat { error: String },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Object { error: String },
    Text(String),
}

impl ErrorBody {
    pub fn message(self) -> String {
        match self {
            ErrorBody::Detail {
                detail: ErrorDetail::Object { error },
            }
            | ErrorBody::Detail {
                detail: ErrorDetail::Text(error),
            }
            | ErrorBody::Flat { error } => error,
        }
    }
}

pub fn convert_response(resp: SearchResponse) -> Vec<SearchResult> {
    resp.results
        .into_iter()
        .map(|item| SearchResult {
            // Blank titles fall back to a numbered reference later.
            title: item.title.filter(|title| !title.trim().is_empty()),
            url: item.url,
            content: item.content,
        })
        .collect()
}
