use parley_model::{ChatResponse, FinishReason, Message, ToolCall};
use serde::{Deserialize, Serialize};

/// How the fake model answers one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetResponse {
    /// A plain assistant message, finishing with `stop`.
    #[serde(rename = "reply")]
    Reply(String),
    /// An assistant message requesting tool calls, finishing with
    /// `tool_calls`.
    #[serde(rename = "tool_calls")]
    ToolCalls(Vec<ToolCall>),
    /// A non-success HTTP status with the given body.
    #[serde(rename = "failure")]
    Failure {
        /// The status code.
        status: u16,
        /// The response body.
        body: String,
    },
}

impl PresetResponse {
    /// Creates a `Reply` preset.
    #[inline]
    pub fn reply<S: Into<String>>(content: S) -> Self {
        Self::Reply(content.into())
    }

    /// Creates a `ToolCalls` preset.
    #[inline]
    pub fn tool_calls(calls: impl Into<Vec<ToolCall>>) -> Self {
        Self::ToolCalls(calls.into())
    }

    /// Creates a `Failure` preset.
    #[inline]
    pub fn failure<S: Into<String>>(status: u16, body: S) -> Self {
        Self::Failure {
            status,
            body: body.into(),
        }
    }

    /// Converts the preset to a response, or `None` for failures.
    pub fn to_response(&self) -> Option<ChatResponse> {
        match self {
            Self::Reply(content) => Some(ChatResponse::with_message(
                Message::assistant(content.clone()),
                FinishReason::Stop,
            )),
            Self::ToolCalls(calls) => Some(ChatResponse::with_message(
                Message::assistant_tool_calls(calls.clone()),
                FinishReason::ToolCalls,
            )),
            Self::Failure { .. } => None,
        }
    }
}
