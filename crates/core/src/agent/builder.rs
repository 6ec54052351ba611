use parley_model::{ModelProvider, RequestConfig};

use super::Agent;
use super::observer::Observers;
use crate::config::ConfigManager;
use crate::conversation::ConversationStore;
use crate::model_client::ModelClient;
use crate::tool::{Tool, ToolRegistry};
use crate::Result;

/// How many tool rounds a single `send` resolves by default.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    system_prompt: Option<String>,
    config: ConfigManager,
    tools: ToolRegistry,
    max_tool_rounds: usize,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    ///
    /// The configuration starts from [`ConfigManager::with_defaults`].
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: None,
            config: ConfigManager::with_defaults(),
            tools: ToolRegistry::new(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Sets the system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the model.
    #[inline]
    pub fn with_model<S: Into<String>>(self, model: S) -> Self {
        self.with_config(|config| config.with_model(model))
    }

    /// Updates the request configuration.
    pub fn with_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(RequestConfig) -> RequestConfig,
    {
        self.config = ConfigManager::new(f(self.config.all()));
        self
    }

    /// Uses the given configuration manager as is.
    #[inline]
    pub fn with_config_manager(mut self, config: ConfigManager) -> Self {
        self.config = config;
        self
    }

    /// Registers a typed tool.
    ///
    /// Fails if a tool with the same name is registered.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Result<Self> {
        self.tools.register_tool(tool)?;
        Ok(self)
    }

    /// Uses the given tool registry as is.
    #[inline]
    pub fn with_tool_registry(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Sets how many tool rounds a single `send` may resolve.
    #[inline]
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        Agent {
            model_client: self.model_client,
            system_prompt: self.system_prompt,
            conversation: ConversationStore::new(),
            tools: self.tools,
            config: self.config,
            max_tool_rounds: self.max_tool_rounds,
            observers: Observers::default(),
        }
    }
}
