use thiserror::Error;

/// What went wrong in a tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// The arguments did not match the tool's parameters.
    #[error("invalid input")]
    InvalidInput,
    /// The tool ran and failed.
    #[error("execution failed")]
    ExecutionError,
}

/// An error returned by a tool.
///
/// Tool errors are not fatal to the agent: the reason is sent back to the
/// model as the content of the tool message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("{kind}: {reason}")]
pub struct Error {
    kind: ErrorKind,
    reason: String,
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            reason: kind.to_string(),
        }
    }
}

impl Error {
    /// Creates an [`ErrorKind::InvalidInput`] error.
    #[inline]
    pub fn invalid_input() -> Self {
        ErrorKind::InvalidInput.into()
    }

    /// Creates an [`ErrorKind::ExecutionError`] error.
    #[inline]
    pub fn execution_error() -> Self {
        ErrorKind::ExecutionError.into()
    }

    /// Replaces the reason reported to the model.
    #[inline]
    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = reason.into();
        self
    }

    /// Returns the kind of the error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason, which defaults to the description of the kind.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the content of the tool message reporting this error.
    #[inline]
    pub fn to_tool_content(&self) -> String {
        format!("Tool call failed: {}", self.reason())
    }
}
