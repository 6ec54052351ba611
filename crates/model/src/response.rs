use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Message;

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model has finished generating text.
    Stop,
    /// The model needs to call tools.
    ToolCalls,
    /// The token limit was reached.
    Length,
    /// The output was filtered by the provider.
    ContentFilter,
    /// Any value this crate does not know about.
    #[serde(other)]
    Other,
}

/// Token accounting of a response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens generated.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Sum of both.
    #[serde(default)]
    pub total_tokens: u32,
}

/// One completion alternative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Position of this choice.
    #[serde(default)]
    pub index: u32,
    /// The generated message.
    pub message: Message,
    /// Why the generation stopped.
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
    /// Log probabilities, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Value>,
}

/// A complete, non-streamed response from the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Identifier assigned by the provider.
    #[serde(default)]
    pub id: String,
    /// Object type, usually `chat.completion`.
    #[serde(default)]
    pub object: String,
    /// Creation time as a Unix timestamp.
    #[serde(default)]
    pub created: u64,
    /// The model that produced the response.
    #[serde(default)]
    pub model: String,
    /// The completion alternatives. Only the first one is used.
    pub choices: Vec<Choice>,
    /// Token accounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Backend configuration fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

impl ChatResponse {
    /// Creates a response with a single choice, mostly useful for fakes.
    pub fn with_message(
        message: Message,
        finish_reason: FinishReason,
    ) -> Self {
        Self {
            id: String::new(),
            object: "chat.completion".to_owned(),
            created: 0,
            model: String::new(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: Some(finish_reason),
                logprobs: None,
            }],
            usage: None,
            system_fingerprint: None,
        }
    }

    /// Returns the first choice, the only one the agent looks at.
    #[inline]
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }

    /// Returns the text of the first choice's message.
    #[inline]
    pub fn reply(&self) -> Option<&str> {
        self.first_choice().map(|choice| choice.message.content())
    }

    /// Returns `true` if the first choice stopped to call tools.
    #[inline]
    pub fn wants_tool_calls(&self) -> bool {
        self.first_choice().and_then(|choice| choice.finish_reason)
            == Some(FinishReason::ToolCalls)
    }
}
