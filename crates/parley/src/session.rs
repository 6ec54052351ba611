use std::num::NonZeroUsize;

use parley_core::decorator::{Logging, ProfileInjection, SlidingWindow};
use parley_core::ingest::{PlatformMessage, from_platform};
use parley_core::profile::{
    MemoryProfileStore, ProfileMerger, ProfileStore,
};
use parley_core::{Agent, AgentBuilder, ChatAgent, Result};
use parley_model::ModelProvider;

use crate::tools::*;

/// How many messages a session keeps by default.
pub const DEFAULT_WINDOW_SIZE: NonZeroUsize = NonZeroUsize::new(20).unwrap();

/// The decorated agent driving a [`Session`].
pub type SessionAgent<S> = Logging<ProfileInjection<SlidingWindow<Agent>, S>>;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder<S = MemoryProfileStore> {
    agent_builder: AgentBuilder,
    window_size: NonZeroUsize,
    profile_store: S,
    profile_merger: Option<Box<dyn ProfileMerger>>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    ///
    /// The profile is kept in memory unless another store is set with
    /// [`SessionBuilder::with_profile_store`].
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        Self {
            agent_builder: AgentBuilder::with_model_provider(provider),
            window_size: DEFAULT_WINDOW_SIZE,
            profile_store: MemoryProfileStore::default(),
            profile_merger: None,
        }
    }
}

impl<S: ProfileStore> SessionBuilder<S> {
    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<P: Into<String>>(mut self, prompt: P) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<M: Into<String>>(mut self, model: M) -> Self {
        self.agent_builder = self.agent_builder.with_model(model);
        self
    }

    /// Sets how many messages the conversation keeps.
    #[inline]
    pub fn with_window_size(mut self, window_size: NonZeroUsize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Sets where the user profile is stored.
    pub fn with_profile_store<T: ProfileStore>(
        self,
        profile_store: T,
    ) -> SessionBuilder<T> {
        SessionBuilder {
            agent_builder: self.agent_builder,
            window_size: self.window_size,
            profile_store,
            profile_merger: self.profile_merger,
        }
    }

    /// Sets how profile updates are merged into the stored profile.
    ///
    /// See [`AgentMerger`](parley_core::profile::AgentMerger).
    pub fn with_profile_merger<M: ProfileMerger + 'static>(
        mut self,
        merger: M,
    ) -> Self {
        self.profile_merger = Some(Box::new(merger));
        self
    }

    /// Builds a new session, loading the user profile from the store.
    pub async fn build(self) -> Result<Session<S>> {
        let agent = self
            .agent_builder
            .with_tool(CurrentTimeTool::new())?
            .build();
        let agent = SlidingWindow::new(agent, self.window_size);
        let mut agent =
            ProfileInjection::new(agent, self.profile_store).await?;
        if let Some(merger) = self.profile_merger {
            agent = agent.with_merger(merger);
        }

        Ok(Session {
            agent: Logging::new(agent),
        })
    }
}

/// A conversation with the assistant, fed with messages from a chat
/// platform.
///
/// The session owns a [`SessionAgent`]: the base agent with the built-in
/// tools, wrapped in a sliding window, the profile injection and logging.
pub struct Session<S> {
    agent: SessionAgent<S>,
}

impl<S: ProfileStore> Session<S> {
    /// Returns the agent.
    #[inline]
    pub fn agent(&self) -> &SessionAgent<S> {
        &self.agent
    }

    /// Returns the agent for mutation.
    #[inline]
    pub fn agent_mut(&mut self) -> &mut SessionAgent<S> {
        &mut self.agent
    }

    /// Adds a message to the conversation without replying to it.
    #[inline]
    pub fn record<M: PlatformMessage + ?Sized>(
        &mut self,
        message: &M,
    ) -> Result<()> {
        self.agent.add_message(from_platform(message))
    }

    /// Replies to a message.
    ///
    /// Messages written by bots are ignored and `None` is returned, so that
    /// bots cannot keep talking to each other.
    pub async fn reply<M: PlatformMessage + ?Sized>(
        &mut self,
        message: &M,
    ) -> Result<Option<String>> {
        if message.is_from_bot() {
            trace!("ignoring a bot message");
            return Ok(None);
        }

        self.record(message)?;
        let resp = self.agent.send(None).await?;
        Ok(Some(resp.reply().unwrap_or_default().to_owned()))
    }
}
