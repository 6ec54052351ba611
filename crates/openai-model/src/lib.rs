//! A model provider for OpenAI-compatible APIs.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::sync::Arc;

use parley_model::{
    ChatRequest, ChatResponse, ErrorKind, ModelProvider, ModelProviderError,
};
use reqwest::{Client, header};

pub use config::{
    API_KEY_ENV, BASE_URL_ENV, OpenAIConfig, OpenAIConfigBuilder,
};

/// Error type for [`OpenAIProvider`].
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    message: String,
    kind: ErrorKind,
    status: Option<u16>,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            status: None,
        }
    }

    fn with_status(status: u16, message: impl Into<String>) -> Self {
        let kind = if status == 429 {
            ErrorKind::RateLimitExceeded
        } else {
            ErrorKind::Status
        };
        Self {
            message: message.into(),
            kind,
            status: Some(status),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

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

/// OpenAI-compatible model provider.
///
/// Requests are sent to `{base_url}/chat/completions` with streaming
/// disabled, and the whole response body is decoded at once.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Result<Client, String>,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    ///
    /// If the HTTP client cannot be built, every request fails with a
    /// configuration error.
    pub fn new(config: OpenAIConfig) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|err| {
            warn!("failed to build http client: {err}");
            format!("failed to build http client: {err}")
        });
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, Self::Error>> + Send + 'static
    {
        let resp_fut = 'blk: {
            let client = match &self.client {
                Ok(client) => client,
                Err(message) => {
                    break 'blk Err(Error::new(
                        message.as_str(),
                        ErrorKind::Configuration,
                    ));
                }
            };
            let Some(api_key) = self.config.api_key.as_deref() else {
                break 'blk Err(Error::new(
                    "OpenAI API key is not configured",
                    ErrorKind::Configuration,
                ));
            };
            let Some(endpoint) = self.config.endpoint() else {
                break 'blk Err(Error::new(
                    "OpenAI base URL is not configured",
                    ErrorKind::Configuration,
                ));
            };

            let openai_req = proto::create_request(req);
            debug!(
                "sending chat completion request to {endpoint} with {} messages",
                req.messages.len()
            );
            Ok(client
                .post(endpoint)
                .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
                .header(header::CONTENT_TYPE, "application/json")
                .json(&openai_req)
                .send())
        };

        async move {
            let resp = resp_fut?.await.map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::Network)
            })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::with_status(
                    status.as_u16(),
                    format!("LLM API returned {status}: {body}"),
                ));
            }

            resp.json::<ChatResponse>().await.map_err(|err| {
                Error::new(
                    format!("Invalid response body: {err}"),
                    ErrorKind::InvalidResponse,
                )
            })
        }
    }
}
