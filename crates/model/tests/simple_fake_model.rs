use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;

use parley_model::{
    ChatRequest, ChatResponse, ErrorKind, FinishReason, Message,
    ModelProvider, ModelProviderError, RequestConfig,
};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, Self::Error>> + Send + 'static
    {
        let result = 'blk: {
            if req.model().is_none() {
                break 'blk Err(FakeModelProviderError(
                    ErrorKind::Configuration,
                ));
            }

            let Some(last) = req.messages.last() else {
                break 'blk Err(FakeModelProviderError(ErrorKind::Other));
            };
            Ok(ChatResponse::with_message(
                Message::assistant(format!("You said {}", last.content())),
                FinishReason::Stop,
            ))
        };
        ready(result)
    }
}

#[tokio::test]
async fn test_completion() {
    let provider = FakeModelProvider;
    let req = ChatRequest {
        params: RequestConfig::new().with_model("fake"),
        messages: vec![Message::user("Good morning")],
        tools: vec![],
    };
    let resp = provider.send_request(&req).await.unwrap();
    assert_eq!(resp.reply(), Some("You said Good morning"));
}

#[tokio::test]
async fn test_error() {
    let provider = FakeModelProvider;
    let req = ChatRequest {
        params: RequestConfig::new(),
        messages: vec![Message::user("Good morning")],
        tools: vec![],
    };
    let err = provider.send_request(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.status(), None);
}
