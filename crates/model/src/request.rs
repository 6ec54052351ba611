use serde::Serialize;

use crate::{Message, RequestConfig, ToolDefinition};

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// Model parameters, flattened into the top-level object.
    #[serde(flatten)]
    pub params: RequestConfig,
    /// The input messages.
    pub messages: Vec<Message>,
    /// Tools that are available to the model.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    /// Returns the model identifier of this request.
    #[inline]
    pub fn model(&self) -> Option<&str> {
        self.params.model()
    }
}
