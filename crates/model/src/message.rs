use serde::{Deserialize, Serialize};

use crate::ToolCall;

/// The role of a [`Message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The system instructions.
    System,
    /// The human side of the conversation.
    User,
    /// The model side of the conversation.
    Assistant,
    /// A tool call result.
    Tool,
}

/// A single entry of the conversation.
///
/// The enum is tagged by `role` on the wire, so it can be sent to and
/// received from the chat-completion endpoint as is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// The system instructions.
    System {
        /// The instructions.
        content: String,
        /// An optional participant name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// A user input text.
    User {
        /// The text.
        content: String,
        /// An optional participant name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// An assistant text, possibly carrying tool call requests.
    Assistant {
        /// The text. Providers send `null` when the message only carries
        /// tool calls.
        #[serde(default)]
        content: Option<String>,
        /// An optional participant name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Tool calls requested by the model.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// A tool call result.
    Tool {
        /// The result of the tool call.
        content: String,
        /// The identifier of the tool call this message answers.
        tool_call_id: String,
    },
}

impl Message {
    /// Creates a system message.
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::System {
            content: content.into(),
            name: None,
        }
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::User {
            content: content.into(),
            name: None,
        }
    }

    /// Creates a plain assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            name: None,
            tool_calls: vec![],
        }
    }

    /// Creates an assistant message that requests tool calls.
    #[inline]
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: None,
            name: None,
            tool_calls,
        }
    }

    /// Creates a tool result message answering the call `tool_call_id`.
    #[inline]
    pub fn tool<ID: Into<String>, S: Into<String>>(
        tool_call_id: ID,
        content: S,
    ) -> Self {
        Self::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Sets the participant name. Tool messages have no name and are
    /// returned unchanged.
    pub fn with_name<S: Into<String>>(mut self, new_name: S) -> Self {
        match &mut self {
            Self::System { name, .. }
            | Self::User { name, .. }
            | Self::Assistant { name, .. } => *name = Some(new_name.into()),
            Self::Tool { .. } => {}
        }
        self
    }

    /// Returns the role of this message.
    #[inline]
    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Returns the text content, or an empty string if there is none.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            Self::System { content, .. }
            | Self::User { content, .. }
            | Self::Tool { content, .. } => content,
            Self::Assistant { content, .. } => content.as_deref().unwrap_or(""),
        }
    }

    /// Returns the participant name, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::System { name, .. }
            | Self::User { name, .. }
            | Self::Assistant { name, .. } => name.as_deref(),
            Self::Tool { .. } => None,
        }
    }

    /// Returns the tool calls carried by an assistant message.
    #[inline]
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Returns `true` if this is a system message.
    #[inline]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }
}
