use std::sync::Arc;

use async_trait::async_trait;
use parley_model::{ChatResponse, Message, RequestConfig, ToolDefinition};

use crate::tool::ToolHandler;
use crate::{ChatAgent, Result};

/// The target of the events emitted by [`Logging`].
pub const LOG_TARGET: &str = "parley::agent";

/// Records every call and its result as `tracing` events.
///
/// Errors are recorded and returned unchanged.
pub struct Logging<A> {
    inner: A,
}

impl<A> Logging<A> {
    /// Wraps `inner`.
    #[inline]
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    /// Returns the wrapped agent.
    #[inline]
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Unwraps the agent.
    #[inline]
    pub fn into_inner(self) -> A {
        self.inner
    }
}

fn logged<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => debug!(target: LOG_TARGET, operation, "succeeded"),
        Err(err) => error!(target: LOG_TARGET, operation, "failed: {err}"),
    }
    result
}

#[async_trait]
impl<A: ChatAgent> ChatAgent for Logging<A> {
    fn add_message(&mut self, message: Message) -> Result<()> {
        debug!(
            target: LOG_TARGET,
            role = ?message.role(),
            name = message.name(),
            "add_message: {}",
            message.content()
        );
        logged("add_message", self.inner.add_message(message))
    }

    fn messages(&self) -> Vec<Message> {
        let messages = self.inner.messages();
        trace!(target: LOG_TARGET, count = messages.len(), "messages");
        messages
    }

    fn set_messages(&mut self, messages: Vec<Message>) -> Result<()> {
        debug!(target: LOG_TARGET, count = messages.len(), "set_messages");
        logged("set_messages", self.inner.set_messages(messages))
    }

    fn config(&self) -> RequestConfig {
        let config = self.inner.config();
        trace!(target: LOG_TARGET, ?config, "config");
        config
    }

    fn set_config(&mut self, config: RequestConfig) -> Result<()> {
        debug!(target: LOG_TARGET, ?config, "set_config");
        logged("set_config", self.inner.set_config(config))
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        let tools = self.inner.tools();
        trace!(target: LOG_TARGET, count = tools.len(), "tools");
        tools
    }

    fn register_tool(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        debug!(target: LOG_TARGET, tool = %definition.name, "register_tool");
        logged("register_tool", self.inner.register_tool(definition, handler))
    }

    fn declare_tool(&mut self, definition: ToolDefinition) -> Result<()> {
        debug!(target: LOG_TARGET, tool = %definition.name, "declare_tool");
        logged("declare_tool", self.inner.declare_tool(definition))
    }

    async fn send(
        &mut self,
        config_override: Option<RequestConfig>,
    ) -> Result<ChatResponse> {
        info!(
            target: LOG_TARGET,
            ?config_override,
            messages = self.inner.messages().len(),
            "send"
        );
        let result = self.inner.send(config_override).await;
        match &result {
            Ok(resp) => info!(
                target: LOG_TARGET,
                finish_reason =
                    ?resp.first_choice().and_then(|choice| choice.finish_reason),
                usage = ?resp.usage,
                "send completed: {}",
                resp.reply().unwrap_or_default()
            ),
            Err(err) => {
                error!(target: LOG_TARGET, operation = "send", "failed: {err}")
            }
        }
        result
    }
}
