//! Core logic of the search agent: the agent loop, tool execution, web
//! search, result formatting, the relevance gate and the identity store
//! abstraction.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
pub mod format;
pub mod identity;
mod model_client;
pub mod relevance;
pub mod retry;
pub mod search;
pub mod summary;
pub mod tool;

pub use agent::{
    Agent, AgentAction, AgentBuilder, AgentError, AgentOutcome, AgentRun,
    AgentStep, DEFAULT_MAX_ITERATIONS,
};
pub use model_client::{ModelClient, ModelError};
