//! Wire-level types shared by the agent and the model providers.
//!
//! The shapes in this crate follow the chat-completion protocol closely:
//! a [`Message`] serializes exactly as the provider expects it inside the
//! `messages` array, and a [`ChatResponse`] deserializes straight from the
//! response body. Providers only add the transport around them.
//!
//! Types in this crate don't define any behavior beyond construction and
//! inspection. The conversation loop itself lives in `parley-core`.

#![deny(missing_docs)]

mod config;
mod error;
mod message;
mod provider;
mod request;
mod response;
mod tool;

pub use config::*;
pub use error::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
pub use tool::*;
