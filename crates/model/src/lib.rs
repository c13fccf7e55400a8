//! An abstraction layer for the completion services the agent talks to.
//!
//! This crate establishes an unified protocol for the agent to interact
//! with various supported LLMs, so that the agent and the summarizers can
//! switch between them without modifying the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to. Responses are
//! always delivered in one piece; the agent never consumes partial output.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
