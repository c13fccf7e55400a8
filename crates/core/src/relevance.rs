//! Checks whether a query matches what a user declared in their profile.

use crate::identity::UserProfile;
use crate::model_client::{ModelClient, ModelError};

/// Shown instead of an answer when a query is not relevant to the user.
pub const REFUSAL_MESSAGE: &str = "I'm sorry, but this query doesn't seem \
    to be related to your department or interests, so I can't search for \
    it. Please ask something closer to your profile.";

/// The verdict of a [`RelevanceGate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relevance {
    /// The query may go to the agent.
    Relevant,
    /// The query is refused.
    NotRelevant,
}

/// Interprets the classifier's completion.
///
/// Only a literal "yes" (ignoring case and surrounding whitespace) counts
/// as relevant.
#[inline]
pub fn classify_answer(answer: &str) -> Relevance {
    if answer.trim().eq_ignore_ascii_case("yes") {
        Relevance::Relevant
    } else {
        Relevance::NotRelevant
    }
}

/// Asks the model whether a query fits a user profile.
#[derive(Clone)]
pub struct RelevanceGate {
    client: ModelClient,
}

impl RelevanceGate {
    /// Creates a gate that classifies with `client`.
    #[inline]
    pub fn new(client: ModelClient) -> Self {
        Self { client }
    }

    /// Classifies `query` against `profile` with one model call.
    pub async fn check(
        &self,
        query: &str,
        profile: &UserProfile,
    ) -> Result<Relevance, ModelError> {
        let answer = self.client.complete(prompt(query, profile)).await?;
        let relevance = classify_answer(&answer);
        debug!("relevance of {query:?}: {relevance:?} ({answer:?})");
        Ok(relevance)
    }
}

fn prompt(query: &str, profile: &UserProfile) -> String {
    let interests = profile
        .interests
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "A user works in the department \"{department}\" and is interested \
         in: {interests}.\n\nIs the following query relevant to their \
         department or interests?\n\nQuery: {query}\n\nAnswer with only \
         \"yes\" or \"no\".",
        department = profile.department,
    )
}

#[cfg(test)]
mod tests {
    use search_agent_model::ModelMessage;
    use search_agent_test_model::TestModelProvider;

    use super::*;

    #[test]
    fn test_classify_answer() {
        assert_eq!(classify_answer("yes"), Relevance::Relevant);
        assert_eq!(classify_answer("  YES\n"), Relevance::Relevant);
        assert_eq!(classify_answer("Yes"), Relevance::Relevant);
        for answer in ["", "No", "no", "maybe", "yes.", "Yes, it is"] {
            assert_eq!(classify_answer(answer), Relevance::NotRelevant);
        }
    }

    #[tokio::test]
    async fn test_check() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response(" Yes ");
        provider.add_text_response("maybe");
        let gate = RelevanceGate::new(ModelClient::new(provider.clone()));
        let profile = UserProfile::from_fields("Research", "ml, rust", "");

        let relevance = gate.check("borrow checker", &profile).await.unwrap();
        assert_eq!(relevance, Relevance::Relevant);
        let relevance = gate.check("football", &profile).await.unwrap();
        assert_eq!(relevance, Relevance::NotRelevant);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let ModelMessage::User(prompt) = &requests[0].messages[0] else {
            panic!("expected a user prompt");
        };
        assert!(prompt.contains("\"Research\""));
        assert!(prompt.contains("ml, rust"));
        assert!(prompt.contains("Query: borrow checker"));
    }
}
