use std::future::ready;
use std::pin::Pin;

use parley_model::ToolDefinition;
use serde_json::Value;

use super::{Error, Tool, ToolResult};

/// The future returned by a [`ToolHandler`].
pub type BoxToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Executes tool calls with already parsed JSON arguments.
///
/// Closures of the form `Fn(Value) -> impl Future<Output = ToolResult>`
/// are handlers, and so are typed tools wrapped in [`AnyTool`].
pub trait ToolHandler: Send + Sync + 'static {
    /// Calls the tool.
    fn call(&self, arguments: Value) -> BoxToolFuture;
}

impl<F, Fut> ToolHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    #[inline]
    fn call(&self, arguments: Value) -> BoxToolFuture {
        Box::pin(self(arguments))
    }
}

/// Adapts a typed [`Tool`] into a [`ToolHandler`].
pub struct AnyTool<T: Tool>(pub T);

impl<T: Tool> AnyTool<T> {
    /// Returns the definition advertised to the model.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.0.name(),
            self.0.description(),
            self.0.parameter_schema().clone(),
        )
    }
}

impl<T: Tool> ToolHandler for AnyTool<T> {
    fn call(&self, arguments: Value) -> BoxToolFuture {
        let input: T::Input = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(ready(ToolResult::Err(
                    Error::invalid_input().with_reason(reason),
                )));
            }
        };
        Box::pin(self.0.execute(input))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::ErrorKind;

    struct Echo {
        schema: Value,
    }

    #[derive(Deserialize)]
    struct EchoInput {
        text: String,
    }

    impl Tool for Echo {
        type Input = EchoInput;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeats the text."
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.text))
        }
    }

    fn echo() -> AnyTool<Echo> {
        AnyTool(Echo {
            schema: json!({ "type": "object" }),
        })
    }

    #[tokio::test]
    async fn test_typed_tool() {
        let tool = echo();
        assert_eq!(tool.definition().name, "echo");

        let result = tool.call(json!({ "text": "hey" })).await;
        assert_eq!(result, Ok("hey".to_owned()));

        let err = tool.call(json!({ "txt": "hey" })).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_tool_content().starts_with("Tool call failed: "));
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let handler = |args: Value| async move {
            match args["n"].as_i64() {
                Some(n) => Ok(format!("{}", n * 2)),
                None => Err(Error::execution_error()),
            }
        };
        assert_eq!(
            ToolHandler::call(&handler, json!({ "n": 21 })).await,
            Ok("42".to_owned())
        );
        assert_eq!(
            ToolHandler::call(&handler, json!({}))
                .await
                .unwrap_err()
                .reason(),
            "execution failed"
        );
    }
}
