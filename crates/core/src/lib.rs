//! Core logic including the agent loop, the conversation store, the tool
//! registry, request configuration and the agent decorators.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod config;
pub mod conversation;
pub mod decorator;
mod error;
pub mod ingest;
mod model_client;
pub mod profile;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, ChatAgent, DEFAULT_MAX_TOOL_ROUNDS, Subscription,
};
pub use error::{Error, Result, StateError, TransportError};
