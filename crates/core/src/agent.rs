mod builder;
mod state;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use search_agent_model::ModelTool;
use tracing::Instrument;

use crate::model_client::{ModelClient, ModelError};
use crate::tool::{Error as ToolError, Executor as ToolExecutor};
pub use builder::AgentBuilder;
use state::{AgentStage, AgentState};
pub use state::{AgentAction, AgentOutcome, AgentRun, AgentStep};

/// The default limit of tool invocations per query.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

type OnStepFn = Arc<dyn Fn(&AgentStep) + Send + Sync>;

/// Errors that end an agent run without an answer.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The completion service failed.
    #[error("model request failed: {0}")]
    Model(ModelError),
    /// The model asked for a tool that is not registered.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// A tool rejected its input or failed to run.
    #[error("tool `{tool}` failed: {source}")]
    Tool {
        /// Name of the tool.
        tool: String,
        /// What went wrong.
        source: ToolError,
    },
    /// The model kept asking for tools past the configured limit.
    #[error("no final answer after {0} tool invocation(s)")]
    IterationLimitExceeded(usize),
}

/// An agent that answers one query at a time, calling tools as the model
/// requests them.
///
/// Each run starts in the deciding stage, where the model either gives
/// the final answer or asks for tool calls. Requested tools run one after
/// another, their observations are appended to the history, and the model
/// is asked again. A run never performs more than `max_iterations` tool
/// invocations.
pub struct Agent {
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    tool_definitions: Vec<ModelTool>,
    system_prompt: String,
    max_iterations: usize,
    on_step: Option<OnStepFn>,
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            system_prompt,
            max_iterations,
            on_step,
            tools,
        } = builder;

        let tool_executor = ToolExecutor::with_tools(tools);
        let tool_definitions = tool_executor.definitions();
        Self {
            model_client,
            tool_executor,
            tool_definitions,
            system_prompt,
            max_iterations,
            on_step,
        }
    }

    /// Returns the limit of tool invocations per run.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Answers `input`, starting with an empty history.
    pub async fn run<S: Into<String>>(
        &self,
        input: S,
    ) -> Result<AgentRun, AgentError> {
        let state = AgentState::new(input.into());
        let span = info_span!("agent run", input = state.input.as_str());
        self.drive(state).instrument(span).await
    }

    async fn drive(
        &self,
        mut state: AgentState,
    ) -> Result<AgentRun, AgentError> {
        loop {
            match std::mem::take(&mut state.stage) {
                AgentStage::Deciding => {
                    let req = state.build_model_request(
                        &self.system_prompt,
                        &self.tool_definitions,
                    );
                    let resp = self
                        .model_client
                        .send_request(&req)
                        .await
                        .map_err(AgentError::Model)?;
                    state.stage = match AgentOutcome::from_response(resp) {
                        AgentOutcome::Actions(actions) => {
                            debug!("model requested {} tool(s)", actions.len());
                            AgentStage::ToolInvocation(actions)
                        }
                        AgentOutcome::Finish(output) => {
                            AgentStage::Finished(output)
                        }
                    };
                }
                AgentStage::ToolInvocation(actions) => {
                    for action in actions {
                        let step =
                            self.invoke(action, state.steps.len()).await?;
                        if let Some(on_step) = &self.on_step {
                            on_step(&step);
                        }
                        state.steps.push(step);
                    }
                    state.stage = AgentStage::Deciding;
                }
                AgentStage::Finished(output) => {
                    info!("finished after {} step(s)", state.steps.len());
                    return Ok(state.into_run(output));
                }
            }
        }
    }

    async fn invoke(
        &self,
        action: AgentAction,
        steps_taken: usize,
    ) -> Result<AgentStep, AgentError> {
        if steps_taken >= self.max_iterations {
            warn!("iteration limit reached ({})", self.max_iterations);
            return Err(AgentError::IterationLimitExceeded(self.max_iterations));
        }
        let Some(fut) = self.tool_executor.execute(&action.to_request()) else {
            return Err(AgentError::ToolNotFound(action.tool));
        };
        let span = debug_span!("tool", name = action.tool.as_str());
        let observation = match fut.instrument(span).await {
            Ok(observation) => observation,
            Err(source) => {
                error!("tool {} failed: {source}", action.tool);
                return Err(AgentError::Tool {
                    tool: action.tool,
                    source,
                });
            }
        };
        Ok(AgentStep {
            action,
            observation,
        })
    }
}
