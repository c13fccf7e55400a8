use std::sync::Arc;

use search_agent_core::conversation::{Conversation, ConversationId};
use search_agent_core::format::format_search_results;
use search_agent_core::identity::{
    AccountId, IdentityError, IdentityStore, UserProfile,
};
use search_agent_core::relevance::{REFUSAL_MESSAGE, Relevance, RelevanceGate};
use search_agent_core::retry::RetryPolicy;
use search_agent_core::search::{
    SearchClient, SearchError, SearchProvider, SearchTool, parse_observation,
};
use search_agent_core::summary::{conversation_title, overall_summary};
use search_agent_core::{
    Agent, AgentBuilder, AgentError, AgentStep, ModelClient, ModelError,
};
use search_agent_model::ModelProvider;
use tracing::Instrument;

/// Shown in place of an answer when the query could not be processed.
pub const APOLOGY_MESSAGE: &str = "I apologize, but I encountered an error \
    while processing the search results. Please try your query again or \
    rephrase it.";

/// Shown when the agent kept searching without reaching an answer.
pub const ITERATION_LIMIT_MESSAGE: &str = "I couldn't complete this search \
    within the allowed number of steps. Please try a more specific query.";

/// Errors raised while answering a query.
///
/// They never leave [`Session::send_message`], which turns them into a
/// reply through [`SessionError::user_message`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The agent failed.
    #[error(transparent)]
    Agent(#[from] AgentError),
    /// A summary or classification request failed.
    #[error("model request failed: {0}")]
    Model(ModelError),
    /// The direct search failed.
    #[error(transparent)]
    Search(#[from] SearchError),
    /// The first step did not produce search results.
    #[error("unexpected observation from `{0}`")]
    UnexpectedObservation(String),
}

impl SessionError {
    /// Returns the reply shown to the user for this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::Agent(AgentError::IterationLimitExceeded(_)) => {
                ITERATION_LIMIT_MESSAGE
            }
            _ => APOLOGY_MESSAGE,
        }
    }
}

/// Returns the short message shown for a failed signup or login.
pub fn identity_message(err: &IdentityError) -> String {
    match err {
        IdentityError::DuplicateEmail => "Email already exists".to_owned(),
        IdentityError::AccountNotFound | IdentityError::InvalidCredentials => {
            "Invalid email or password".to_owned()
        }
        err => format!("An error occurred: {err}"),
    }
}

/// The signed-in user of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    id: AccountId,
    email: String,
    profile: Option<UserProfile>,
}

impl User {
    /// Returns the account identifier.
    #[inline]
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// Returns the email address used to sign in.
    #[inline]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the profile, if the account has one.
    #[inline]
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    model_client: ModelClient,
    search_client: SearchClient,
    retry_policy: Option<RetryPolicy>,
    system_prompt: Option<String>,
    max_iterations: Option<usize>,
    on_step: Option<Box<dyn Fn(&AgentStep) + Send + Sync>>,
    identity_store: Option<Arc<dyn IdentityStore>>,
}

impl SessionBuilder {
    /// Creates a session builder with the specified model and search
    /// providers.
    pub fn with_providers<M, S>(model_provider: M, search_provider: S) -> Self
    where
        M: ModelProvider + 'static,
        S: SearchProvider + 'static,
    {
        Self::with_clients(
            ModelClient::new(model_provider),
            SearchClient::new(search_provider),
        )
    }

    /// Creates a session builder that shares existing clients.
    pub fn with_clients(
        model_client: ModelClient,
        search_client: SearchClient,
    ) -> Self {
        Self {
            model_client,
            search_client,
            retry_policy: None,
            system_prompt: None,
            max_iterations: None,
            on_step: None,
            identity_store: None,
        }
    }

    /// Sets the retry policy of every model and search call.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the limit of tool invocations per query.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Attaches a callback to be invoked after each tool the agent runs.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&AgentStep) + Send + Sync + 'static,
    ) -> Self {
        self.on_step = Some(Box::new(on_step));
        self
    }

    /// Sets where accounts and profiles are kept.
    ///
    /// Without a store, signing up and logging in always fail.
    #[inline]
    pub fn with_identity_store(
        mut self,
        identity_store: Arc<dyn IdentityStore>,
    ) -> Self {
        self.identity_store = Some(identity_store);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let Self {
            mut model_client,
            mut search_client,
            retry_policy,
            system_prompt,
            max_iterations,
            on_step,
            identity_store,
        } = self;

        if let Some(retry_policy) = retry_policy {
            model_client = model_client.with_retry_policy(retry_policy.clone());
            search_client = search_client.with_retry_policy(retry_policy);
        }

        let mut agent_builder =
            AgentBuilder::with_model_client(model_client.clone())
                .with_tool(SearchTool::new(search_client.clone()));
        if let Some(prompt) = system_prompt {
            agent_builder = agent_builder.with_system_prompt(prompt);
        }
        if let Some(max_iterations) = max_iterations {
            agent_builder = agent_builder.with_max_iterations(max_iterations);
        }
        if let Some(on_step) = on_step {
            agent_builder = agent_builder.on_step(on_step);
        }

        Session {
            agent: agent_builder.build(),
            relevance_gate: RelevanceGate::new(model_client.clone()),
            model_client,
            search_client,
            identity_store,
            conversations: vec![],
            current: None,
            user: None,
        }
    }
}

/// A chat session: the conversations of one user and the services that
/// answer them.
///
/// Conversations are kept in creation order and live as long as the
/// session does.
pub struct Session {
    agent: Agent,
    model_client: ModelClient,
    search_client: SearchClient,
    relevance_gate: RelevanceGate,
    identity_store: Option<Arc<dyn IdentityStore>>,
    conversations: Vec<Conversation>,
    current: Option<ConversationId>,
    user: Option<User>,
}

impl Session {
    /// Starts an empty conversation and makes it the current one.
    pub fn new_conversation(&mut self) -> ConversationId {
        let conversation = Conversation::new();
        let id = conversation.id();
        self.conversations.push(conversation);
        self.current = Some(id);
        id
    }

    /// Makes `id` the current conversation.
    ///
    /// Returns `false` and changes nothing if there is no such
    /// conversation.
    pub fn select_conversation(&mut self, id: ConversationId) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        self.current = Some(id);
        true
    }

    /// Returns all conversations in creation order.
    #[inline]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Returns the current conversation, if any.
    pub fn current_conversation(&self) -> Option<&Conversation> {
        let idx = self.position(self.current?)?;
        Some(&self.conversations[idx])
    }

    /// Returns the signed-in user, if any.
    #[inline]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Sends a message to the current conversation and returns the reply,
    /// which is appended to the conversation as well.
    ///
    /// A conversation is started if none is selected. Failures never
    /// escape; they become an apology in the conversation.
    pub async fn send_message(&mut self, text: &str) -> String {
        let idx = match self.current.and_then(|id| self.position(id)) {
            Some(idx) => idx,
            None => {
                self.new_conversation();
                self.conversations.len() - 1
            }
        };
        let conversation_id = self.conversations[idx].id();
        let span = info_span!(
            "send message",
            conversation = %conversation_id
        );

        async {
            self.conversations[idx].push_user(text);
            if self.conversations[idx].messages().len() == 1 {
                self.update_title(idx).await;
            }

            let reply = match self.answer(text).await {
                Ok(reply) => reply,
                Err(err) => {
                    error!("failed to answer: {err}");
                    err.user_message().to_owned()
                }
            };
            self.conversations[idx].push_assistant(reply.clone());
            reply
        }
        .instrument(span)
        .await
    }

    async fn update_title(&mut self, idx: usize) {
        let messages = self.conversations[idx].messages();
        let title = conversation_title(&self.model_client, messages).await;
        match title {
            Ok(title) => self.conversations[idx].set_title(title),
            // The placeholder title stays.
            Err(err) => warn!("failed to derive a title: {err}"),
        }
    }

    async fn answer(&self, query: &str) -> Result<String, SessionError> {
        if let Some(profile) = self.user.as_ref().and_then(User::profile) {
            let relevance = self
                .relevance_gate
                .check(query, profile)
                .await
                .map_err(SessionError::Model)?;
            if relevance == Relevance::NotRelevant {
                info!("query refused by the relevance gate");
                return Ok(REFUSAL_MESSAGE.to_owned());
            }
        }

        let run = self.agent.run(query).await?;
        let results = match run.steps.first() {
            Some(step) => {
                let tool = &step.action.tool;
                parse_observation(&step.observation).ok_or_else(|| {
                    SessionError::UnexpectedObservation(tool.clone())
                })?
            }
            None => {
                debug!("the agent answered without searching");
                self.search_client.search(query).await?
            }
        };

        let formatted = format_search_results(&self.model_client, &results)
            .await
            .map_err(SessionError::Model)?;
        let summary = overall_summary(&self.model_client, &results)
            .await
            .map_err(SessionError::Model)?;
        Ok(format!(
            "{}\n\n{formatted}\nOverall Summary:\n{summary}",
            run.output
        ))
    }

    /// Creates an account, stores its profile and signs it in.
    ///
    /// Signup is all or nothing: if the profile cannot be stored, the new
    /// account is deleted again.
    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        profile: UserProfile,
    ) -> Result<&User, IdentityError> {
        let store = self.identity_store()?;
        let id = store.create_account(email, password).await?;
        if let Err(err) = store.set_profile(&id, &profile).await {
            warn!("storing profile of {id} failed, rolling back: {err}");
            if let Err(rollback) = store.delete_account(&id).await {
                error!("failed to delete account {id}: {rollback}");
            }
            return Err(err);
        }
        info!("signed up {id}");
        Ok(&*self.user.insert(User {
            id,
            email: email.trim().to_owned(),
            profile: Some(profile),
        }))
    }

    /// Signs an existing account in and loads its profile.
    pub async fn log_in(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<&User, IdentityError> {
        let store = self.identity_store()?;
        let id = store.authenticate(email, password).await?;
        let profile = store.profile(&id).await?;
        if profile.is_none() {
            warn!("account {id} has no profile, relevance checks are off");
        }
        info!("logged in {id}");
        Ok(&*self.user.insert(User {
            id,
            email: email.trim().to_owned(),
            profile,
        }))
    }

    /// Signs the current user out. Conversations are kept.
    #[inline]
    pub fn log_out(&mut self) {
        if let Some(user) = self.user.take() {
            info!("logged out {}", user.id);
        }
    }

    fn identity_store(&self) -> Result<Arc<dyn IdentityStore>, IdentityError> {
        self.identity_store.clone().ok_or_else(|| {
            IdentityError::Backend("no identity store configured".to_owned())
        })
    }

    #[inline]
    fn position(&self, id: ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| c.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_messages() {
        assert_eq!(
            identity_message(&IdentityError::DuplicateEmail),
            "Email already exists"
        );
        assert_eq!(
            identity_message(&IdentityError::AccountNotFound),
            "Invalid email or password"
        );
        assert_eq!(
            identity_message(&IdentityError::InvalidCredentials),
            "Invalid email or password"
        );
        assert_eq!(
            identity_message(&IdentityError::Backend("boom".to_owned())),
            "An error occurred: identity backend error: boom"
        );
    }

    #[test]
    fn test_user_messages() {
        let err = SessionError::Agent(AgentError::IterationLimitExceeded(10));
        assert_eq!(err.user_message(), ITERATION_LIMIT_MESSAGE);
        let err = SessionError::Agent(AgentError::ToolNotFound("x".into()));
        assert_eq!(err.user_message(), APOLOGY_MESSAGE);
        let err = SessionError::UnexpectedObservation("x".to_owned());
        assert_eq!(err.user_message(), APOLOGY_MESSAGE);
    }
}
