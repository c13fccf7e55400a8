//! Model-generated summaries: conversation titles, per-result excerpts and
//! the overall summary of a result list.

use crate::conversation::{Message, NEW_CONVERSATION_TITLE};
use crate::model_client::{ModelClient, ModelError};
use crate::search::{MAX_RESULTS, SearchResult};

/// Returned by [`overall_summary`] for an empty result list.
pub const NOTHING_TO_SUMMARIZE: &str =
    "No information available to summarize.";

/// Derives a short title from the first message of a conversation.
///
/// Makes no model call when there are no messages.
pub async fn conversation_title(
    client: &ModelClient,
    messages: &[Message],
) -> Result<String, ModelError> {
    let Some(first) = messages.first() else {
        return Ok(NEW_CONVERSATION_TITLE.to_owned());
    };
    let prompt = format!(
        "Summarize the following message in 5 words or less: {}",
        first.content()
    );
    let title = client.complete(prompt).await?;
    Ok(title.trim().to_owned())
}

/// Summarizes a single search result excerpt in three lines.
pub async fn summarize_excerpt(
    client: &ModelClient,
    content: &str,
) -> Result<String, ModelError> {
    let prompt = format!(
        "Provide a three-line summary of the following content:\n\n\
         {content}\n\nSummary:"
    );
    let summary = client.complete(prompt).await?;
    Ok(summary.trim().to_owned())
}

/// Summarizes the first [`MAX_RESULTS`] results in one model call.
///
/// Results without an excerpt contribute an empty string. The completion
/// is returned as is.
pub async fn overall_summary(
    client: &ModelClient,
    results: &[SearchResult],
) -> Result<String, ModelError> {
    if results.is_empty() {
        return Ok(NOTHING_TO_SUMMARIZE.to_owned());
    }
    let combined = results
        .iter()
        .take(MAX_RESULTS)
        .map(|result| result.content.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ");
    let prompt = format!(
        "Provide a concise overall summary of the following information:\
         \n\n{combined}\n\nSummary:"
    );
    client.complete(prompt).await
}
