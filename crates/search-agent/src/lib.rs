//! An AI-powered search engine that assembles the agent, the web search
//! tool, the summarizers and the identity store into chat sessions.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring search sessions into your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod session;

pub use config::{Config, ConfigError};
pub use session::{
    APOLOGY_MESSAGE, ITERATION_LIMIT_MESSAGE, Session, SessionBuilder,
    SessionError, User, identity_message,
};

/// Re-exports of [`search_agent_core`] crate.
pub mod core {
    pub use search_agent_core::*;
}
