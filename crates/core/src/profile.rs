//! Storage of the user profile injected by
//! [`ProfileInjection`](crate::decorator::ProfileInjection), and merging of
//! profile updates.

use std::io;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use parley_model::Message;

use crate::{ChatAgent, Error, Result};

/// Name of the assistant message carrying the stored profile to a merger
/// agent.
pub const CURRENT_PROFILE_MESSAGE_NAME: &str = "current_profile";

/// Loads and saves the user profile, a free-form markdown text.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns the stored profile, or an empty string if there is none.
    async fn load(&self) -> io::Result<String>;

    /// Replaces the stored profile.
    async fn save(&self, profile: &str) -> io::Result<()>;
}

/// A profile store that lives in memory.
///
/// Clones share the same profile.
#[derive(Clone, Debug, Default)]
pub struct MemoryProfileStore {
    profile: Arc<RwLock<String>>,
}

impl MemoryProfileStore {
    /// Creates a store holding `profile`.
    pub fn with_profile<S: Into<String>>(profile: S) -> Self {
        Self {
            profile: Arc::new(RwLock::new(profile.into())),
        }
    }

    /// Returns the current profile.
    pub fn profile(&self) -> String {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn load(&self) -> io::Result<String> {
        Ok(self.profile())
    }

    async fn save(&self, profile: &str) -> io::Result<()> {
        *self.profile.write().unwrap_or_else(PoisonError::into_inner) =
            profile.to_owned();
        Ok(())
    }
}

/// Combines the stored profile with an update written by the model.
///
/// Without a merger, `set_profile` stores the update as is.
#[async_trait]
pub trait ProfileMerger: Send {
    /// Returns the profile to store.
    async fn merge(&mut self, current: &str, update: &str) -> Result<String>;
}

#[async_trait]
impl<M: ProfileMerger + ?Sized> ProfileMerger for Box<M> {
    #[inline]
    async fn merge(&mut self, current: &str, update: &str) -> Result<String> {
        (**self).merge(current, update).await
    }
}

/// Merges profile updates with a dedicated agent.
///
/// The agent receives the current profile as an assistant message named
/// `current_profile` and the update as a user message, and must answer
/// with the merged profile. Its system prompt should describe how to merge,
/// and a low temperature is advisable. The conversation is cleared after
/// each merge.
pub struct AgentMerger<A> {
    agent: A,
}

impl<A: ChatAgent> AgentMerger<A> {
    /// Uses `agent` to merge profiles.
    #[inline]
    pub fn new(agent: A) -> Self {
        Self { agent }
    }

    /// Returns the merging agent.
    #[inline]
    pub fn agent(&self) -> &A {
        &self.agent
    }

    async fn run(&mut self, current: &str, update: &str) -> Result<String> {
        self.agent.add_message(
            Message::assistant(current).with_name(CURRENT_PROFILE_MESSAGE_NAME),
        )?;
        self.agent.add_message(Message::user(update))?;

        let resp = self.agent.send(None).await?;
        match resp.reply() {
            Some(merged) if !merged.trim().is_empty() => Ok(merged.to_owned()),
            _ => Err(Error::MalformedResponse(
                "profile merger returned no text".to_owned(),
            )),
        }
    }
}

#[async_trait]
impl<A: ChatAgent> ProfileMerger for AgentMerger<A> {
    async fn merge(&mut self, current: &str, update: &str) -> Result<String> {
        let merged = self.run(current, update).await;
        self.agent.set_messages(Vec::new())?;
        let merged = merged?;
        debug!(
            "merged a profile of {} bytes with an update of {} bytes",
            current.len(),
            update.len()
        );
        Ok(merged)
    }
}
