use parley_model::{ErrorKind, ModelProviderError};

/// A specialized `Result` type for agent operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the agent and its decorators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not be built, nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The model provider failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The provider answered with something the agent cannot interpret.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// The model called a tool that is not registered.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// The arguments of a tool call are not valid JSON.
    #[error("invalid arguments for tool `{name}`: {source}")]
    ToolArgument {
        /// Name of the called tool.
        name: String,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The model kept calling tools for more rounds than allowed.
    #[error("tool resolution did not finish within {0} rounds")]
    ToolLoopExceeded(usize),
    /// A store, registry or config operation was rejected.
    #[error(transparent)]
    State(#[from] StateError),
    /// Reading or writing external state failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// Rejected state mutations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The target has been locked.
    #[error("target is locked")]
    Locked,
    /// `lock` was called on a locked target.
    #[error("target is already locked")]
    AlreadyLocked,
    /// A tool with the same name is registered.
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),
    /// No tool with the given name is registered.
    #[error("tool `{0}` is not registered")]
    NotFound(String),
    /// System messages are kept outside of the conversation.
    #[error("system messages cannot be stored in the conversation")]
    SystemMessage,
    /// An index is past the end of the conversation.
    #[error("index {index} is out of bounds for length {len}")]
    OutOfBounds {
        /// The requested index.
        index: usize,
        /// The length at the time of the call.
        len: usize,
    },
}

/// A model provider failure, detached from the provider's error type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    kind: ErrorKind,
    status: Option<u16>,
}

impl TransportError {
    pub(crate) fn from_provider(err: &dyn ModelProviderError) -> Self {
        Self {
            message: err.to_string(),
            kind: err.kind(),
            status: err.status(),
        }
    }

    /// Returns the message reported by the provider.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the kind of the failure.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the HTTP status, if the server answered.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}
