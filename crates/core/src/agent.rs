mod builder;
mod observer;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use parley_model::{
    ChatRequest, ChatResponse, Message, RequestConfig, ToolCall,
    ToolDefinition,
};
use serde_json::Value;
use tracing::Instrument;

use crate::config::ConfigManager;
use crate::conversation::ConversationStore;
use crate::model_client::ModelClient;
use crate::tool::{Resolution, ToolHandler, ToolRegistry};
use crate::{Error, Result, StateError, TransportError};
pub use builder::{AgentBuilder, DEFAULT_MAX_TOOL_ROUNDS};
use observer::Observers;
pub use observer::Subscription;

/// The operations shared by the agent and every decorator around it.
///
/// A decorator owns exactly one inner `ChatAgent` and forwards whatever it
/// doesn't change, so decorators can be stacked in any order.
#[async_trait]
pub trait ChatAgent: Send {
    /// Adds a message to the conversation.
    ///
    /// A system message replaces the system prompt instead.
    fn add_message(&mut self, message: Message) -> Result<()>;

    /// Returns the conversation, with the system prompt first if present.
    fn messages(&self) -> Vec<Message>;

    /// Replaces the conversation.
    ///
    /// A system message in `messages` replaces the system prompt, which is
    /// kept otherwise.
    fn set_messages(&mut self, messages: Vec<Message>) -> Result<()>;

    /// Returns a copy of the request configuration.
    fn config(&self) -> RequestConfig;

    /// Replaces the request configuration.
    fn set_config(&mut self, config: RequestConfig) -> Result<()>;

    /// Returns the definitions of the available tools.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Registers a tool with a local handler.
    fn register_tool(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()>;

    /// Declares a tool whose calls are returned to the caller of
    /// [`ChatAgent::send`] unanswered.
    fn declare_tool(&mut self, definition: ToolDefinition) -> Result<()>;

    /// Sends the conversation to the model and resolves tool calls until
    /// the model answers with a plain assistant message.
    ///
    /// `config_override` is shallow-merged over the configuration for the
    /// requests of this call only.
    async fn send(
        &mut self,
        config_override: Option<RequestConfig>,
    ) -> Result<ChatResponse>;
}

/// The base agent, which owns the conversation, the tools and the
/// configuration, and talks to the model provider.
///
/// Every response is interpreted by its `finish_reason`: a `tool_calls`
/// response makes the agent run the requested tools, append their results
/// and send again, anything else ends the call.
pub struct Agent {
    model_client: ModelClient,
    system_prompt: Option<String>,
    conversation: ConversationStore,
    tools: ToolRegistry,
    config: ConfigManager,
    max_tool_rounds: usize,
    observers: Observers,
}

impl Agent {
    /// Returns the system prompt.
    #[inline]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Replaces the system prompt.
    pub fn set_system_prompt<S: Into<String>>(
        &mut self,
        prompt: Option<S>,
    ) -> Result<()> {
        if self.conversation.is_locked() {
            return Err(StateError::Locked.into());
        }
        self.system_prompt = prompt.map(Into::into);
        Ok(())
    }

    /// Returns the conversation store.
    #[inline]
    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    /// Returns the conversation store for mutation.
    #[inline]
    pub fn conversation_mut(&mut self) -> &mut ConversationStore {
        &mut self.conversation
    }

    /// Returns the tool registry.
    #[inline]
    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Returns the tool registry for mutation.
    #[inline]
    pub fn tool_registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    /// Returns the configuration manager.
    #[inline]
    pub fn config_manager(&self) -> &ConfigManager {
        &self.config
    }

    /// Returns the configuration manager for mutation.
    #[inline]
    pub fn config_manager_mut(&mut self) -> &mut ConfigManager {
        &mut self.config
    }

    /// Returns how many tool rounds one `send` may resolve.
    #[inline]
    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    /// Registers a callback invoked with every completed request and its
    /// response, including the intermediate ones of tool rounds.
    ///
    /// The callback stays registered until the returned subscription is
    /// used to unsubscribe; dropping the subscription does not remove it.
    pub fn on_request<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChatRequest, &ChatResponse) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    fn build_request(
        &self,
        config_override: Option<&RequestConfig>,
    ) -> Result<ChatRequest> {
        let mut params = self.config.all().without_reserved();
        if let Some(config_override) = config_override {
            params.merge(&config_override.without_reserved());
        }

        let messages = self.messages();
        if messages.is_empty() {
            return Err(Error::InvalidRequest("no messages to send".to_owned()));
        }
        if params.model().is_none() {
            return Err(Error::InvalidRequest("model is not set".to_owned()));
        }

        Ok(ChatRequest {
            params,
            messages,
            tools: self.tools.definitions(),
        })
    }

    async fn resolve(
        &mut self,
        config_override: Option<RequestConfig>,
    ) -> Result<ChatResponse> {
        let mut rounds = 0;
        loop {
            let request = self.build_request(config_override.as_ref())?;
            debug!(
                "sending request with {} messages and {} tools",
                request.messages.len(),
                request.tools.len()
            );
            let resp = self
                .model_client
                .send_request(request.clone())
                .await
                .map_err(|err| TransportError::from_provider(err.as_ref()))?;
            self.observers.notify(&request, &resp);

            let Some(choice) = resp.first_choice() else {
                return Err(Error::MalformedResponse(
                    "response has no choices".to_owned(),
                ));
            };
            let message = choice.message.clone();
            let calls = message.tool_calls().to_vec();

            if !resp.wants_tool_calls() || calls.is_empty() {
                trace!("got a final response: {:?}", choice.finish_reason);
                self.conversation.append(message)?;
                return Ok(resp);
            }

            if rounds >= self.max_tool_rounds {
                warn!("giving up after {rounds} tool rounds");
                return Err(Error::ToolLoopExceeded(self.max_tool_rounds));
            }
            rounds += 1;

            let mark = self.conversation.len();
            self.conversation.append(message)?;
            match self.run_tool_calls(calls).await {
                // Some calls must be answered by the caller.
                Ok(true) => return Ok(resp),
                Ok(false) => {}
                Err(err) => {
                    self.discard_round(mark);
                    return Err(err);
                }
            }
        }
    }

    /// Drops a tool round that could not be completed, so no call is left
    /// without its result.
    fn discard_round(&mut self, mark: usize) {
        debug!(
            "discarding {} messages of a failed tool round",
            self.conversation.len().saturating_sub(mark)
        );
        if let Err(err) = self.conversation.truncate(mark) {
            warn!("failed to discard the tool round: {err}");
        }
    }

    /// Runs the calls with local handlers and appends their results.
    /// Returns `true` if any call was left for the caller.
    async fn run_tool_calls(&mut self, calls: Vec<ToolCall>) -> Result<bool> {
        let mut deferred = false;
        for call in calls {
            let name = call.function.name;
            let handler = match self.tools.resolve(&name) {
                Some(Resolution::Local(handler)) => handler,
                Some(Resolution::External) => {
                    debug!("leaving call {} to {name} to the caller", call.id);
                    deferred = true;
                    continue;
                }
                None => {
                    warn!("tool not found: {name}");
                    return Err(Error::ToolNotFound(name));
                }
            };

            let arguments = parse_arguments(&call.function.arguments)
                .map_err(|source| Error::ToolArgument {
                    name: name.clone(),
                    source,
                })?;
            trace!("calling tool {name} ({}) with args: {arguments:?}", call.id);
            let content = match handler
                .call(arguments)
                .instrument(debug_span!("tool execute", tool = %name))
                .await
            {
                Ok(content) => content,
                Err(err) => {
                    debug!("tool {name} failed: {err}");
                    err.to_tool_content()
                }
            };
            self.conversation.append(Message::tool(call.id, content))?;
        }
        Ok(deferred)
    }
}

fn parse_arguments(arguments: &str) -> serde_json::Result<Value> {
    // Some models send an empty string for calls without parameters.
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(arguments)
}

#[async_trait]
impl ChatAgent for Agent {
    fn add_message(&mut self, message: Message) -> Result<()> {
        if let Message::System { content, .. } = message {
            return self.set_system_prompt(Some(content));
        }
        Ok(self.conversation.append(message)?)
    }

    fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.conversation.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.clone()));
        }
        messages.extend_from_slice(self.conversation.get());
        messages
    }

    fn set_messages(&mut self, messages: Vec<Message>) -> Result<()> {
        let (system, rest): (Vec<_>, Vec<_>) =
            messages.into_iter().partition(Message::is_system);
        self.conversation.set(rest)?;
        if let Some(Message::System { content, .. }) = system.into_iter().last()
        {
            self.system_prompt = Some(content);
        }
        Ok(())
    }

    #[inline]
    fn config(&self) -> RequestConfig {
        self.config.all()
    }

    #[inline]
    fn set_config(&mut self, config: RequestConfig) -> Result<()> {
        Ok(self.config.replace(config)?)
    }

    #[inline]
    fn tools(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    #[inline]
    fn register_tool(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        Ok(self.tools.register_shared(definition, handler)?)
    }

    #[inline]
    fn declare_tool(&mut self, definition: ToolDefinition) -> Result<()> {
        Ok(self.tools.declare(definition)?)
    }

    async fn send(
        &mut self,
        config_override: Option<RequestConfig>,
    ) -> Result<ChatResponse> {
        self.resolve(config_override)
            .instrument(debug_span!("agent send"))
            .await
    }
}
