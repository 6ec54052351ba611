//! Tool call supports.

mod error;
mod handler;
mod registry;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub use handler::{AnyTool, BoxToolFuture, ToolHandler};
pub(crate) use registry::Resolution;
pub use registry::ToolRegistry;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless. Anything the tool
/// needs at execution time (a clock, a storage handle) should be an
/// immutable part of it, set during initialization and copied into the
/// returned future.
///
/// Tools are turned into [`ToolHandler`]s with [`AnyTool`], which decodes
/// the call arguments into [`Tool::Input`] first.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
