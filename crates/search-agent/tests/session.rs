use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use search_agent::core::conversation::Role;
use search_agent::core::identity::{
    AccountId, IdentityError, IdentityStore, MemoryIdentityStore, UserProfile,
};
use search_agent::core::relevance::REFUSAL_MESSAGE;
use search_agent::core::retry::RetryPolicy;
use search_agent::core::search::{
    SearchError, SearchProvider, SearchResult, SearchTool,
};
use search_agent::{
    APOLOGY_MESSAGE, ITERATION_LIMIT_MESSAGE, Session, SessionBuilder,
};
use search_agent_model::{ModelResponse, ToolCallRequest};
use search_agent_test_model::{PresetResponse, TestModelProvider};
use serde_json::json;

#[derive(Default)]
struct FakeSearch {
    results: Vec<SearchResult>,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.queries.lock().unwrap().push(query.to_owned());
        Ok(self.results.clone())
    }
}

/// Keeps accounts in memory but cannot write profiles.
#[derive(Default)]
struct ProfilesDown(MemoryIdentityStore);

#[async_trait]
impl IdentityStore for ProfilesDown {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, IdentityError> {
        self.0.create_account(email, password).await
    }

    async fn find_account(
        &self,
        email: &str,
    ) -> Result<AccountId, IdentityError> {
        self.0.find_account(email).await
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, IdentityError> {
        self.0.authenticate(email, password).await
    }

    async fn profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<UserProfile>, IdentityError> {
        self.0.profile(id).await
    }

    async fn set_profile(
        &self,
        _id: &AccountId,
        _profile: &UserProfile,
    ) -> Result<(), IdentityError> {
        Err(IdentityError::Backend("database down".to_owned()))
    }

    async fn delete_account(
        &self,
        id: &AccountId,
    ) -> Result<(), IdentityError> {
        self.0.delete_account(id).await
    }
}

fn paris_results() -> Vec<SearchResult> {
    vec![
        SearchResult {
            title: Some("Paris - Wikipedia".to_owned()),
            url: Some("https://en.wikipedia.org/wiki/Paris".to_owned()),
            content: Some("Paris is the capital of France.".to_owned()),
        },
        SearchResult {
            title: None,
            url: Some("https://example.com/france".to_owned()),
            content: Some("France's capital city is Paris.".to_owned()),
        },
    ]
}

fn search_call(query: &str) -> PresetResponse {
    PresetResponse::with_response(ModelResponse::tool_calls(vec![
        ToolCallRequest {
            id: "call_1".to_owned(),
            name: SearchTool::NAME.to_owned(),
            arguments: json!({ "query": query }),
        },
    ]))
}

struct Fixture {
    model: TestModelProvider,
    search: Arc<FakeSearch>,
    identity: Arc<MemoryIdentityStore>,
}

impl Fixture {
    fn new(results: Vec<SearchResult>) -> Self {
        Self {
            model: TestModelProvider::default(),
            search: Arc::new(FakeSearch {
                results,
                ..Default::default()
            }),
            identity: Arc::new(MemoryIdentityStore::new()),
        }
    }

    fn builder(&self) -> SessionBuilder {
        SessionBuilder::with_providers(
            self.model.clone(),
            Arc::clone(&self.search),
        )
        .with_identity_store(self.identity.clone())
        .with_retry_policy(RetryPolicy::none())
    }

    fn session(&self) -> Session {
        self.builder().build()
    }

    fn queries(&self) -> Vec<String> {
        self.search.queries.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn test_answer_with_sources() {
    let mut fixture = Fixture::new(paris_results());
    fixture.model.add_text_response("Capital of France");
    fixture.model.add_response(search_call("capital of France"));
    fixture.model.add_text_response("The capital of France is Paris.");
    fixture.model.add_text_response("Paris is France's capital.");
    fixture.model.add_text_response("Paris is the capital city.");
    fixture.model.add_text_response("Paris is the capital of France.");

    let mut session = fixture.session();
    let reply = session.send_message("What is the capital of France?").await;

    assert_eq!(
        reply,
        "The capital of France is Paris.\n\n\
         Top 5 Sources:\n\n\
         1. [Paris - Wikipedia](https://en.wikipedia.org/wiki/Paris)\n   \
         Paris is France's capital.\n\n\
         2. [Reference 2](https://example.com/france)\n   \
         Paris is the capital city.\n\n\
         \nOverall Summary:\nParis is the capital of France."
    );
    assert_eq!(fixture.queries(), vec!["capital of France".to_owned()]);
    assert_eq!(fixture.model.remaining(), 0);

    let conversation = session.current_conversation().unwrap();
    assert_eq!(conversation.title(), "Capital of France");
    let messages = conversation.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[0].content(), "What is the capital of France?");
    assert_eq!(messages[1].role(), Role::Assistant);
    assert_eq!(messages[1].content(), reply);
}

#[tokio::test]
async fn test_direct_search_without_steps() {
    let mut fixture = Fixture::new(paris_results()[..1].to_vec());
    fixture.model.add_text_response("Greeting");
    fixture.model.add_text_response("Hello! Here is what I found.");
    fixture.model.add_text_response("A summary.");
    fixture.model.add_text_response("Overall.");

    let mut session = fixture.session();
    let reply = session.send_message("Hello").await;

    assert!(
        reply.starts_with("Hello! Here is what I found.\n\nTop 5 Sources:")
    );
    assert!(reply.ends_with("\nOverall Summary:\nOverall."));
    assert_eq!(fixture.queries(), vec!["Hello".to_owned()]);
}

#[tokio::test]
async fn test_no_results() {
    let mut fixture = Fixture::new(vec![]);
    fixture.model.add_text_response("Unknown topic");
    fixture.model.add_text_response("I could not find anything.");

    let mut session = fixture.session();
    let reply = session.send_message("xyzzy").await;

    assert_eq!(
        reply,
        "I could not find anything.\n\nNo search results found.\n\
         Overall Summary:\nNo information available to summarize."
    );
    assert_eq!(fixture.model.requests().len(), 2);
}

#[tokio::test]
async fn test_title_is_derived_once() {
    let mut fixture = Fixture::new(vec![]);
    fixture.model.add_text_response("First question");
    fixture.model.add_text_response("First answer.");
    fixture.model.add_text_response("Second answer.");

    let mut session = fixture.session();
    session.send_message("first").await;
    session.send_message("second").await;

    let conversation = session.current_conversation().unwrap();
    assert_eq!(conversation.title(), "First question");
    assert_eq!(conversation.messages().len(), 4);
    assert_eq!(fixture.model.requests().len(), 3);
}

#[tokio::test]
async fn test_failure_becomes_apology() {
    let mut fixture = Fixture::new(paris_results());
    fixture.model.add_text_response("Broken");
    // The script runs dry, so the agent's first request fails.

    let mut session = fixture.session();
    let reply = session.send_message("What is the capital of France?").await;

    assert_eq!(reply, APOLOGY_MESSAGE);
    let conversation = session.current_conversation().unwrap();
    assert_eq!(conversation.messages().len(), 2);
    assert_eq!(conversation.messages()[1].content(), APOLOGY_MESSAGE);
}

#[tokio::test]
async fn test_iteration_limit_message() {
    let mut fixture = Fixture::new(paris_results());
    fixture.model.add_text_response("Looping");
    fixture.model.add_response(search_call("one"));
    fixture.model.add_response(search_call("two"));

    let mut session = fixture.builder().with_max_iterations(1).build();
    let reply = session.send_message("Loop").await;

    assert_eq!(reply, ITERATION_LIMIT_MESSAGE);
    assert_eq!(fixture.queries(), vec!["one".to_owned()]);
}

#[tokio::test]
async fn test_conversations() {
    let fixture = Fixture::new(vec![]);
    let mut session = fixture.session();
    assert!(session.current_conversation().is_none());

    let first = session.new_conversation();
    let second = session.new_conversation();
    assert_ne!(first, second);
    assert_eq!(session.current_conversation().unwrap().id(), second);
    assert_eq!(session.conversations().len(), 2);
    assert_eq!(session.conversations()[0].title(), "New Conversation");

    assert!(session.select_conversation(first));
    assert_eq!(session.current_conversation().unwrap().id(), first);

    let foreign = fixture.session().new_conversation();
    assert!(!session.select_conversation(foreign));
    assert_eq!(session.current_conversation().unwrap().id(), first);
}

#[tokio::test]
async fn test_message_without_conversation_starts_one() {
    let mut fixture = Fixture::new(vec![]);
    fixture.model.add_text_response("Title");
    fixture.model.add_text_response("Answer.");

    let mut session = fixture.session();
    session.send_message("question").await;
    assert_eq!(session.conversations().len(), 1);
    assert_eq!(session.current_conversation().unwrap().title(), "Title");
}

#[tokio::test]
async fn test_relevance_gate() {
    let mut fixture = Fixture::new(vec![]);
    let mut session = fixture.session();
    let profile = UserProfile::from_fields("Research", "ml, rust", "python");
    session
        .sign_up("ada@example.com", "secret1", profile)
        .await
        .unwrap();

    // Refused: title, then the classification.
    fixture.model.add_text_response("Football scores");
    fixture.model.add_text_response("No");
    let reply = session.send_message("Latest football scores").await;
    assert_eq!(reply, REFUSAL_MESSAGE);
    assert_eq!(fixture.model.requests().len(), 2);
    assert!(fixture.queries().is_empty());

    // Accepted: classification, then the agent.
    fixture.model.add_text_response(" YES ");
    fixture.model.add_text_response("Rust 2024 is out.");
    let reply = session.send_message("What's new in Rust?").await;
    assert!(reply.starts_with("Rust 2024 is out."));
    assert_eq!(fixture.queries(), vec!["What's new in Rust?".to_owned()]);
}

#[tokio::test]
async fn test_duplicate_signup_writes_no_profile() {
    let fixture = Fixture::new(vec![]);
    let mut session = fixture.session();
    let first = UserProfile::from_fields("Research", "ml", "rust");
    let user = session
        .sign_up("ada@example.com", "secret1", first.clone())
        .await
        .unwrap();
    let id = user.id().clone();

    let err = session
        .sign_up(
            "ada@example.com",
            "secret2",
            UserProfile::from_fields("Sales", "golf", ""),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::DuplicateEmail));
    assert_eq!(search_agent::identity_message(&err), "Email already exists");
    assert_eq!(fixture.identity.profile(&id).await.unwrap(), Some(first));
    assert_eq!(session.user().unwrap().id(), &id);
}

#[tokio::test]
async fn test_signup_rolls_back_without_profile() {
    let fixture = Fixture::new(vec![]);
    let store = Arc::new(ProfilesDown::default());
    let mut session = fixture
        .builder()
        .with_identity_store(store.clone())
        .build();
    let profile = UserProfile::from_fields("Research", "ml", "rust");

    let err = session
        .sign_up("ada@example.com", "secret1", profile.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Backend(_)));
    assert!(session.user().is_none());
    assert!(matches!(
        store.find_account("ada@example.com").await,
        Err(IdentityError::AccountNotFound)
    ));

    // A retry is not mistaken for a duplicate.
    let err = session
        .sign_up("ada@example.com", "secret1", profile)
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Backend(_)));
    assert!(matches!(
        session.log_in("ada@example.com", "secret1").await,
        Err(IdentityError::AccountNotFound)
    ));
}

#[tokio::test]
async fn test_login_loads_profile() {
    let fixture = Fixture::new(vec![]);
    let profile = UserProfile::from_fields("Research", "ml", "rust");
    let id = fixture
        .identity
        .create_account("ada@example.com", "secret1")
        .await
        .unwrap();
    fixture.identity.set_profile(&id, &profile).await.unwrap();

    let mut session = fixture.session();
    let err = session
        .log_in("ada@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert_eq!(
        search_agent::identity_message(&err),
        "Invalid email or password"
    );
    assert!(session.user().is_none());

    let user = session.log_in("ada@example.com", "secret1").await.unwrap();
    assert_eq!(user.email(), "ada@example.com");
    assert_eq!(user.profile(), Some(&profile));

    session.log_out();
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_identity_without_store() {
    let fixture = Fixture::new(vec![]);
    let mut session = SessionBuilder::with_providers(
        fixture.model.clone(),
        Arc::clone(&fixture.search),
    )
    .build();
    let err = session
        .log_in("ada@example.com", "secret1")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Backend(_)));
    assert!(
        search_agent::identity_message(&err).starts_with("An error occurred:")
    );
}
