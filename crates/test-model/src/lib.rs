//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use parley_model::{
    ChatRequest, ChatResponse, ErrorKind, ModelProvider, ModelProviderError,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
    status: Option<u16>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    fn status(&self) -> Option<u16> {
        self.status
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    requests: Vec<ChatRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request, in order. Every request pops one
/// preset. If the script runs out, an error is returned.
///
/// Clones share the same script, so a test can keep one clone to inspect
/// the recorded requests after handing the other one to an agent.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Creates a provider with the given script.
    pub fn with_responses(
        responses: impl IntoIterator<Item = PresetResponse>,
    ) -> Self {
        let provider = Self::default();
        for response in responses {
            provider.add_response(response);
        }
        provider
    }

    /// Appends a preset to the script.
    #[inline]
    pub fn add_response(&self, response: PresetResponse) {
        self.lock().responses.push_back(response);
    }

    /// Makes every response wait for `duration` first.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far.
    #[inline]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of requests received so far.
    #[inline]
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Returns the number of presets not consumed yet.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.lock().responses.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, Self::Error>> + Send + 'static
    {
        let preset = {
            let mut script = self.lock();
            script.requests.push(req.clone());
            script.responses.pop_front()
        };
        let delay = self.delay;

        async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            let Some(preset) = preset else {
                return Err(Error {
                    message: "no enough steps".to_owned(),
                    kind: ErrorKind::Other,
                    status: None,
                });
            };
            match preset {
                PresetResponse::Failure { status, body } => Err(Error {
                    message: format!("LLM API returned {status}: {body}"),
                    kind: if status == 429 {
                        ErrorKind::RateLimitExceeded
                    } else {
                        ErrorKind::Status
                    },
                    status: Some(status),
                }),
                preset => preset.to_response().ok_or_else(|| Error {
                    message: "invalid preset".to_owned(),
                    kind: ErrorKind::InvalidResponse,
                    status: None,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use parley_model::{Message, RequestConfig, ToolCall};

    use super::*;

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            params: RequestConfig::new().with_model("test"),
            messages: vec![Message::user(text)],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::tool_calls([ToolCall::function(
                "call_1",
                "get_time",
                "{}",
            )]),
            PresetResponse::reply("Hello, world!"),
        ]);

        let resp = provider.send_request(&request("Hi")).await.unwrap();
        assert!(resp.wants_tool_calls());
        assert_eq!(resp.choices[0].message.tool_calls()[0].id, "call_1");

        let resp = provider.send_request(&request("And?")).await.unwrap();
        assert_eq!(resp.reply(), Some("Hello, world!"));

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages[0].content(), "And?");
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn test_failures() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::failure(429, "slow down"),
        ]);

        let err = provider.send_request(&request("Hi")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("slow down"));

        // The script is exhausted now.
        let err = provider.send_request(&request("Hi")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(provider.request_count(), 2);
    }
}
