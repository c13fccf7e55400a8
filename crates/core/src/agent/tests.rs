use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use search_agent_model::{ModelMessage, ModelResponse, ToolCallRequest};
use search_agent_test_model::{PresetResponse, TestModelProvider};
use serde_json::{Value, json};

use super::*;
use crate::search::tests::{FakeSearchProvider, result};
use crate::search::{SearchClient, SearchTool, parse_observation};
use crate::tool::ErrorKind;

fn search_call(id: &str, query: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_owned(),
        name: SearchTool::NAME.to_owned(),
        arguments: json!({ "query": query }),
    }
}

fn tool_call_response(calls: Vec<ToolCallRequest>) -> PresetResponse {
    PresetResponse::with_response(ModelResponse::tool_calls(calls))
}

fn search_agent(
    model_provider: TestModelProvider,
    search_provider: Arc<FakeSearchProvider>,
) -> AgentBuilder {
    AgentBuilder::with_model_provider(model_provider)
        .with_tool(SearchTool::new(SearchClient::new(search_provider)))
}

#[tokio::test]
async fn test_immediate_answer() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("Hello! How can I help?");
    let search_provider = Arc::new(FakeSearchProvider::default());

    let agent =
        search_agent(model_provider.clone(), Arc::clone(&search_provider))
            .build();
    let run = agent.run("Hi").await.unwrap();

    assert_eq!(run.input, "Hi");
    assert_eq!(run.output, "Hello! How can I help?");
    assert!(run.steps.is_empty());
    assert!(search_provider.queries.lock().unwrap().is_empty());

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].messages,
        vec![
            ModelMessage::System("You are a helpful assistant".to_owned()),
            ModelMessage::User("Hi".to_owned()),
        ]
    );
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tools[0].name, SearchTool::NAME);
}

#[tokio::test]
async fn test_single_tool_call() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(tool_call_response(vec![search_call(
        "call_1",
        "capital of France",
    )]));
    model_provider.add_text_response("The capital of France is Paris.");
    let search_provider = Arc::new(FakeSearchProvider {
        results: vec![result(1), result(2)],
        ..Default::default()
    });

    let agent =
        search_agent(model_provider.clone(), Arc::clone(&search_provider))
            .build();
    let run = agent.run("What is the capital of France?").await.unwrap();

    assert_eq!(run.output, "The capital of France is Paris.");
    assert_eq!(run.steps.len(), 1);
    let step = &run.steps[0];
    assert_eq!(step.action.tool, SearchTool::NAME);
    assert_eq!(step.action.tool_input, json!({ "query": "capital of France" }));
    assert_eq!(
        parse_observation(&step.observation).unwrap(),
        vec![result(1), result(2)]
    );
    assert_eq!(
        *search_provider.queries.lock().unwrap(),
        vec!["capital of France".to_owned()]
    );

    // The second decision sees the call and its observation.
    let requests = model_provider.requests();
    assert_eq!(requests.len(), 2);
    let messages = &requests[1].messages;
    assert_eq!(messages.len(), 4);
    assert!(matches!(
        &messages[2],
        ModelMessage::Assistant { tool_calls, .. }
            if tool_calls == &vec![search_call("call_1", "capital of France")]
    ));
    let ModelMessage::Tool(tool_result) = &messages[3] else {
        panic!("expected a tool result");
    };
    assert_eq!(tool_result.id, "call_1");
    assert_eq!(tool_result.content, step.observation);
}

#[tokio::test]
async fn test_multiple_calls_in_one_decision() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(tool_call_response(vec![
        search_call("call_1", "rust"),
        search_call("call_2", "tokio"),
    ]));
    model_provider.add_text_response("Done.");
    let search_provider = Arc::new(FakeSearchProvider::default());

    let steps_seen = Arc::new(AtomicUsize::new(0));
    let agent =
        search_agent(model_provider.clone(), Arc::clone(&search_provider))
            .on_step({
                let steps_seen = Arc::clone(&steps_seen);
                move |_| {
                    steps_seen.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build();
    let run = agent.run("Compare rust and tokio").await.unwrap();

    assert_eq!(run.steps.len(), 2);
    assert_eq!(steps_seen.load(Ordering::SeqCst), 2);
    assert_eq!(model_provider.requests().len(), 2);
    assert_eq!(model_provider.requests()[1].messages.len(), 6);
}

#[tokio::test]
async fn test_unknown_tool() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(tool_call_response(vec![ToolCallRequest {
        id: "call_1".to_owned(),
        name: "shell".to_owned(),
        arguments: json!({ "command": "ls" }),
    }]));
    let agent = search_agent(
        model_provider.clone(),
        Arc::new(FakeSearchProvider::default()),
    )
    .build();

    let err = agent.run("List files").await.unwrap_err();
    assert!(matches!(err, AgentError::ToolNotFound(name) if name == "shell"));
    assert_eq!(model_provider.requests().len(), 1);
}

#[tokio::test]
async fn test_invalid_tool_input() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_response(tool_call_response(vec![ToolCallRequest {
        id: "call_1".to_owned(),
        name: SearchTool::NAME.to_owned(),
        arguments: Value::String("{not json".to_owned()),
    }]));
    let agent = search_agent(
        model_provider,
        Arc::new(FakeSearchProvider::default()),
    )
    .build();

    let err = agent.run("Anything").await.unwrap_err();
    let AgentError::Tool { tool, source } = err else {
        panic!("expected a tool error");
    };
    assert_eq!(tool, SearchTool::NAME);
    assert_eq!(source.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_iteration_limit() {
    let mut model_provider = TestModelProvider::default();
    for n in 0..3 {
        model_provider.add_response(tool_call_response(vec![search_call(
            &format!("call_{n}"),
            "again",
        )]));
    }
    model_provider.add_text_response("never reached");
    let search_provider = Arc::new(FakeSearchProvider::default());

    let agent =
        search_agent(model_provider.clone(), Arc::clone(&search_provider))
            .with_max_iterations(2)
            .build();
    let err = agent.run("Loop forever").await.unwrap_err();

    assert!(matches!(err, AgentError::IterationLimitExceeded(2)));
    assert_eq!(search_provider.queries.lock().unwrap().len(), 2);
    assert_eq!(model_provider.requests().len(), 3);
    assert_eq!(model_provider.remaining(), 1);
}

#[tokio::test]
async fn test_model_error() {
    let agent = search_agent(
        TestModelProvider::default(),
        Arc::new(FakeSearchProvider::default()),
    )
    .build();
    let err = agent.run("Hi").await.unwrap_err();
    assert!(matches!(err, AgentError::Model(_)));
}

#[tokio::test]
async fn test_custom_system_prompt() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_response("ok");
    let observed = Arc::new(Mutex::new(None));
    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_system_prompt("Answer briefly.")
        .on_step({
            let observed = Arc::clone(&observed);
            move |step| *observed.lock().unwrap() = Some(step.clone())
        })
        .build();
    assert_eq!(agent.max_iterations(), DEFAULT_MAX_ITERATIONS);

    agent.run("Hi").await.unwrap();
    let requests = model_provider.requests();
    assert_eq!(
        requests[0].messages[0],
        ModelMessage::System("Answer briefly.".to_owned())
    );
    assert!(requests[0].tools.is_empty());
    assert!(observed.lock().unwrap().is_none());
}
