use std::sync::Arc;

use async_trait::async_trait;
use parley_model::{
    ChatResponse, Message, RequestConfig, ToolCall, ToolChoice,
    ToolDefinition,
};
use serde::Deserialize;
use serde_json::json;

use crate::profile::{ProfileMerger, ProfileStore};
use crate::tool::ToolHandler;
use crate::{ChatAgent, Error, Result};

/// Name of the tool returning the stored profile.
pub const GET_PROFILE_TOOL: &str = "get_profile";
/// Name of the tool replacing the stored profile.
pub const SET_PROFILE_TOOL: &str = "set_profile";
/// Name of the assistant message carrying the profile.
pub const PROFILE_MESSAGE_NAME: &str = "user_profile";
/// How many profile tool rounds a single `send` resolves by default.
pub const DEFAULT_MAX_PROFILE_ROUNDS: usize = 4;

#[derive(Deserialize)]
struct SetProfileInput {
    profile: String,
}

fn get_profile_definition() -> ToolDefinition {
    ToolDefinition::new(
        GET_PROFILE_TOOL,
        "Retrieves the user profile as a markdown string.",
        json!({
            "type": "object",
            "properties": {},
            "required": [],
        }),
    )
}

fn set_profile_definition() -> ToolDefinition {
    ToolDefinition::new(
        SET_PROFILE_TOOL,
        "Replaces the user profile with the given markdown string. \
         Include everything worth keeping from the current profile.",
        json!({
            "type": "object",
            "properties": {
                "profile": {
                    "type": "string",
                    "description": "The new profile. Markdown is supported.",
                },
            },
            "required": ["profile"],
        }),
    )
}

#[inline]
fn is_profile_tool(name: &str) -> bool {
    name == GET_PROFILE_TOOL || name == SET_PROFILE_TOOL
}

/// Gives the model a persistent user profile it can read and rewrite.
///
/// On construction the `get_profile` and `set_profile` tools are declared
/// in the inner agent and the stored profile is injected as an assistant
/// message named `user_profile`. Calls to these tools come back from the
/// inner agent unanswered, and are answered here against the
/// [`ProfileStore`].
///
/// The first request of every `send` forces the tool choice (the
/// `get_profile` function unless configured otherwise); follow-up requests
/// use `auto`.
///
/// A `set_profile` update replaces the stored profile, unless a
/// [`ProfileMerger`] is set to combine the two first. A round that fails
/// is removed from the conversation before the error is returned.
pub struct ProfileInjection<A, S> {
    inner: A,
    store: S,
    merger: Option<Box<dyn ProfileMerger>>,
    first_round_choice: ToolChoice,
    max_rounds: usize,
}

impl<A: ChatAgent, S: ProfileStore> ProfileInjection<A, S> {
    /// Wraps `inner`, declaring the profile tools and injecting the profile
    /// loaded from `store`.
    pub async fn new(mut inner: A, store: S) -> Result<Self> {
        inner.declare_tool(get_profile_definition())?;
        inner.declare_tool(set_profile_definition())?;

        let profile = store.load().await?;
        debug!("injecting a profile of {} bytes", profile.len());
        inner.add_message(
            Message::assistant(profile).with_name(PROFILE_MESSAGE_NAME),
        )?;

        Ok(Self {
            inner,
            store,
            merger: None,
            first_round_choice: ToolChoice::Function(
                GET_PROFILE_TOOL.to_owned(),
            ),
            max_rounds: DEFAULT_MAX_PROFILE_ROUNDS,
        })
    }

    /// Sets the tool choice of the first request of each `send`.
    #[inline]
    pub fn with_first_round_choice(mut self, choice: ToolChoice) -> Self {
        self.first_round_choice = choice;
        self
    }

    /// Merges every `set_profile` update into the stored profile with
    /// `merger`.
    #[inline]
    pub fn with_merger<M>(mut self, merger: M) -> Self
    where
        M: ProfileMerger + 'static,
    {
        self.merger = Some(Box::new(merger));
        self
    }

    /// Sets how many profile tool rounds a single `send` may resolve.
    #[inline]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Returns the profile store.
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the wrapped agent.
    #[inline]
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Removes the assistant message of `resp` and everything after it.
    fn discard_round(&mut self, resp: &ChatResponse) {
        let Some(choice) = resp.first_choice() else {
            return;
        };
        let mut messages = self.inner.messages();
        let Some(index) =
            messages.iter().rposition(|message| *message == choice.message)
        else {
            return;
        };

        debug!(
            "discarding {} messages of a failed profile round",
            messages.len() - index
        );
        messages.truncate(index);
        if let Err(err) = self.inner.set_messages(messages) {
            warn!("failed to discard the profile round: {err}");
        }
    }

    async fn answer_all(&mut self, calls: Vec<ToolCall>) -> Result<()> {
        for call in calls {
            let merger = self.merger.as_deref_mut();
            let content = answer(&self.store, merger, &call).await?;
            self.inner.add_message(Message::tool(call.id, content))?;
        }
        Ok(())
    }

    fn is_answered(&self, call: &ToolCall) -> bool {
        self.inner.messages().iter().any(|message| {
            matches!(
                message,
                Message::Tool { tool_call_id, .. } if *tool_call_id == call.id
            )
        })
    }
}

async fn answer<S: ProfileStore>(
    store: &S,
    merger: Option<&mut (dyn ProfileMerger + 'static)>,
    call: &ToolCall,
) -> Result<String> {
    if call.function.name == GET_PROFILE_TOOL {
        let profile = store.load().await?;
        if profile.trim().is_empty() {
            return Ok("The profile is empty.".to_owned());
        }
        return Ok(profile);
    }

    let arguments = &call.function.arguments;
    let input: SetProfileInput =
        serde_json::from_str(arguments).map_err(|source| {
            Error::ToolArgument {
                name: SET_PROFILE_TOOL.to_owned(),
                source,
            }
        })?;
    let profile = match merger {
        Some(merger) => {
            let current = store.load().await?;
            merger.merge(&current, &input.profile).await?
        }
        None => input.profile,
    };
    store.save(&profile).await?;
    info!("user profile updated ({} bytes)", profile.len());
    Ok("Profile updated.".to_owned())
}

#[async_trait]
impl<A: ChatAgent, S: ProfileStore> ChatAgent for ProfileInjection<A, S> {
    #[inline]
    fn add_message(&mut self, message: Message) -> Result<()> {
        self.inner.add_message(message)
    }

    #[inline]
    fn messages(&self) -> Vec<Message> {
        self.inner.messages()
    }

    #[inline]
    fn set_messages(&mut self, messages: Vec<Message>) -> Result<()> {
        self.inner.set_messages(messages)
    }

    #[inline]
    fn config(&self) -> RequestConfig {
        self.inner.config()
    }

    #[inline]
    fn set_config(&mut self, config: RequestConfig) -> Result<()> {
        self.inner.set_config(config)
    }

    #[inline]
    fn tools(&self) -> Vec<ToolDefinition> {
        self.inner.tools()
    }

    #[inline]
    fn register_tool(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        self.inner.register_tool(definition, handler)
    }

    #[inline]
    fn declare_tool(&mut self, definition: ToolDefinition) -> Result<()> {
        self.inner.declare_tool(definition)
    }

    async fn send(
        &mut self,
        config_override: Option<RequestConfig>,
    ) -> Result<ChatResponse> {
        let mut config = config_override.unwrap_or_default();
        config.set_tool_choice(self.first_round_choice.clone());

        let mut rounds = 0;
        loop {
            let resp = self.inner.send(Some(config.clone())).await?;
            if !resp.wants_tool_calls() {
                return Ok(resp);
            }

            let calls = resp
                .first_choice()
                .map(|choice| choice.message.tool_calls().to_vec())
                .unwrap_or_default();
            let (own, foreign): (Vec<_>, Vec<_>) = calls
                .into_iter()
                .partition(|call| is_profile_tool(&call.function.name));
            if own.is_empty() {
                return Ok(resp);
            }

            if rounds >= self.max_rounds {
                warn!("giving up after {rounds} profile rounds");
                self.discard_round(&resp);
                return Err(Error::ToolLoopExceeded(self.max_rounds));
            }
            rounds += 1;

            if let Err(err) = self.answer_all(own).await {
                self.discard_round(&resp);
                return Err(err);
            }

            if foreign.iter().any(|call| !self.is_answered(call)) {
                // Left for the outer layers.
                return Ok(resp);
            }
            config.set_tool_choice(ToolChoice::Auto);
        }
    }
}
