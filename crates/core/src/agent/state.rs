use search_agent_model::{
    ModelMessage, ModelRequest, ModelResponse, ModelTool, ToolCallRequest,
    ToolCallResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation the model asked for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    /// Identifier of the tool call, echoed back with the observation.
    pub id: String,
    /// Name of the requested tool.
    pub tool: String,
    /// Arguments for the tool.
    pub tool_input: Value,
    /// Text the model produced along with the call, often empty.
    pub log: String,
}

impl AgentAction {
    #[inline]
    pub(crate) fn to_request(&self) -> ToolCallRequest {
        ToolCallRequest {
            id: self.id.clone(),
            name: self.tool.clone(),
            arguments: self.tool_input.clone(),
        }
    }
}

/// An executed action and what the tool returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    /// The action.
    pub action: AgentAction,
    /// The tool output.
    pub observation: String,
}

/// What the model decided to do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentOutcome {
    /// Run these tools, then ask again.
    Actions(Vec<AgentAction>),
    /// Stop with this answer.
    Finish(String),
}

impl AgentOutcome {
    /// Interprets a model response. Any tool call means the loop goes on.
    pub fn from_response(resp: ModelResponse) -> Self {
        if resp.tool_calls.is_empty() {
            return AgentOutcome::Finish(resp.content);
        }
        let log = resp.content;
        let actions = resp
            .tool_calls
            .into_iter()
            .map(|call| AgentAction {
                id: call.id,
                tool: call.name,
                tool_input: call.arguments,
                log: log.clone(),
            })
            .collect();
        AgentOutcome::Actions(actions)
    }
}

#[derive(Debug, Default)]
pub(crate) enum AgentStage {
    #[default]
    Deciding,
    ToolInvocation(Vec<AgentAction>),
    Finished(String),
}

/// The result of a finished agent run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRun {
    /// The query the run started with.
    pub input: String,
    /// Executed steps in order.
    pub steps: Vec<AgentStep>,
    /// The final answer.
    pub output: String,
}

/// State of a single query.
#[derive(Debug)]
pub(crate) struct AgentState {
    pub input: String,
    pub steps: Vec<AgentStep>,
    pub stage: AgentStage,
}

impl AgentState {
    #[inline]
    pub fn new(input: String) -> Self {
        Self {
            input,
            steps: vec![],
            stage: AgentStage::Deciding,
        }
    }

    pub fn build_model_request(
        &self,
        system_prompt: &str,
        tools: &[ModelTool],
    ) -> ModelRequest {
        let mut messages = Vec::with_capacity(2 + self.steps.len() * 2);
        messages.push(ModelMessage::System(system_prompt.to_owned()));
        messages.push(ModelMessage::User(self.input.clone()));
        for step in &self.steps {
            messages.push(ModelMessage::Assistant {
                content: step.action.log.clone(),
                tool_calls: vec![step.action.to_request()],
            });
            messages.push(ModelMessage::Tool(ToolCallResult {
                id: step.action.id.clone(),
                content: step.observation.clone(),
            }));
        }
        ModelRequest {
            messages,
            tools: tools.to_vec(),
        }
    }

    #[inline]
    pub fn into_run(self, output: String) -> AgentRun {
        AgentRun {
            input: self.input,
            steps: self.steps,
            output,
        }
    }
}
