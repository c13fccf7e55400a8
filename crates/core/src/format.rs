//! Renders search results as the "Top 5 Sources" block of a response.

use crate::model_client::{ModelClient, ModelError};
use crate::search::{MAX_RESULTS, SearchResult};
use crate::summary::summarize_excerpt;

/// Returned by [`format_search_results`] for an empty result list.
pub const NO_RESULTS: &str = "No search results found.";

/// Formats up to [`MAX_RESULTS`] results, one numbered entry each.
///
/// Every entry is a markdown link followed by a three-line summary of its
/// excerpt, which costs one model call per entry. The first failing call
/// aborts the whole block.
pub async fn format_search_results(
    client: &ModelClient,
    results: &[SearchResult],
) -> Result<String, ModelError> {
    if results.is_empty() {
        return Ok(NO_RESULTS.to_owned());
    }

    let mut formatted = String::from("Top 5 Sources:\n\n");
    for (idx, result) in results.iter().take(MAX_RESULTS).enumerate() {
        let i = idx + 1;
        let url = result.url();
        let heading = match result.title.as_deref() {
            Some(title) if !title.is_empty() => {
                format!("{i}. [{title}]({url})\n")
            }
            _ => format!("{i}. [Reference {i}]({url})\n"),
        };
        formatted.push_str(&heading);
        let summary = summarize_excerpt(client, result.content()).await?;
        formatted.push_str(&format!("   {summary}\n\n"));
    }
    Ok(formatted)
}
