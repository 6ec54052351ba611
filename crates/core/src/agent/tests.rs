use std::future::ready;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use parley_model::{
    ChatRequest, ChatResponse, ErrorKind, Message, ModelProvider, Role,
    ToolCall, ToolDefinition,
};
use parley_test_model::{PresetResponse, TestModelProvider};
use serde_json::{Value, json};

use super::*;
use crate::tool::{self, ToolResult};

fn get_time_definition() -> ToolDefinition {
    ToolDefinition::new(
        "get_time",
        "Returns the current time.",
        json!({ "type": "object", "properties": {} }),
    )
}

fn get_time(_args: Value) -> impl Future<Output = ToolResult> + Send {
    ready(Ok("12:00".to_owned()))
}

fn agent_with(provider: &TestModelProvider) -> Agent {
    let mut agent = AgentBuilder::with_model_provider(provider.clone())
        .with_system_prompt("You are a clock.")
        .with_config(|config| config.with_model("m").with_max_tokens(10))
        .build();
    agent
        .tool_registry_mut()
        .register(get_time_definition(), get_time)
        .unwrap();
    agent
}

fn roles(messages: &[Message]) -> Vec<Role> {
    messages.iter().map(Message::role).collect()
}

#[tokio::test]
async fn test_simple_reply() {
    let provider =
        TestModelProvider::with_responses([PresetResponse::reply("Hi!")]);
    let mut agent = AgentBuilder::with_model_provider(provider.clone())
        .with_system_prompt("Be nice.")
        .with_model("m")
        .build();

    agent.add_message(Message::user("Hello")).unwrap();
    let resp = agent
        .send(Some(RequestConfig::new().with_temperature(0.2)))
        .await
        .unwrap();
    assert_eq!(resp.reply(), Some("Hi!"));

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let params = &requests[0].params;
    assert_eq!(params.get("temperature"), Some(&json!(0.2)));
    assert_eq!(params.get("max_tokens"), Some(&json!(500)));
    assert_eq!(
        requests[0].messages,
        [Message::system("Be nice."), Message::user("Hello")]
    );

    // The override only applies to that call.
    assert_eq!(agent.config().get("temperature"), Some(&json!(0.7)));
    assert_eq!(
        roles(agent.conversation().get()),
        [Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn test_invalid_request() {
    let provider =
        TestModelProvider::with_responses([PresetResponse::reply("unused")]);

    let mut agent = AgentBuilder::with_model_provider(provider.clone())
        .with_model("m")
        .build();
    let err = agent.send(None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    let mut agent =
        AgentBuilder::with_model_provider(provider.clone()).build();
    agent.add_message(Message::user("Hello")).unwrap();
    let err = agent
        .send(Some(RequestConfig::new().with_model("")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_reserved_keys_are_not_forwarded() {
    let provider =
        TestModelProvider::with_responses([PresetResponse::reply("ok")]);
    let mut agent = agent_with(&provider);
    let manager = agent.config_manager_mut();
    manager.set("messages", json!([])).unwrap();
    manager.set("stream", true).unwrap();

    agent.add_message(Message::user("Hello")).unwrap();
    agent.send(None).await.unwrap();

    let request = &provider.requests()[0];
    assert!(!request.params.contains_key("messages"));
    assert!(!request.params.contains_key("stream"));
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.tools, [get_time_definition()]);
}

#[tokio::test]
async fn test_get_time_scenario() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::tool_calls([ToolCall::function(
            "call_1", "get_time", "{}",
        )]),
        PresetResponse::reply("It is 12:00"),
    ]);
    let mut agent = agent_with(&provider);

    let resp = agent.send(None).await.unwrap();
    assert_eq!(resp.reply(), Some("It is 12:00"));
    assert_eq!(provider.request_count(), 2);

    let stored = agent.conversation().get();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].tool_calls()[0].id, "call_1");
    assert_eq!(stored[1], Message::tool("call_1", "12:00"));
    assert_eq!(stored[2].content(), "It is 12:00");

    // The second request carries exactly the assistant message and the
    // matching tool result.
    let second = &provider.requests()[1];
    assert_eq!(
        roles(&second.messages),
        [Role::System, Role::Assistant, Role::Tool]
    );
    assert_eq!(second.messages[2], Message::tool("call_1", "12:00"));
    assert_eq!(second.params.get("max_tokens"), Some(&json!(10)));
}

/// Asserts that every tool call in `messages` is followed by its result.
fn assert_calls_answered(messages: &[Message]) {
    for (i, message) in messages.iter().enumerate() {
        for call in message.tool_calls() {
            let answered = messages[i + 1..].iter().any(|later| {
                matches!(
                    later,
                    Message::Tool { tool_call_id, .. }
                        if *tool_call_id == call.id
                )
            });
            assert!(answered, "call {} has no result", call.id);
        }
    }
}

#[tokio::test]
async fn test_unknown_tool() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::tool_calls([ToolCall::function(
            "call_1", "read_file", "{}",
        )]),
        PresetResponse::reply("unused"),
    ]);
    let mut agent = agent_with(&provider);
    agent.add_message(Message::user("Read it")).unwrap();

    let err = agent.send(None).await.unwrap_err();
    assert!(matches!(err, Error::ToolNotFound(name) if name == "read_file"));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_failed_round_is_discarded() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::tool_calls([
            ToolCall::function("call_1", "get_time", "{}"),
            ToolCall::function("call_2", "read_file", "{}"),
        ]),
        PresetResponse::reply("Sure."),
    ]);
    let mut agent = agent_with(&provider);
    agent.add_message(Message::user("Read it")).unwrap();

    let err = agent.send(None).await.unwrap_err();
    assert!(matches!(err, Error::ToolNotFound(_)));
    // Neither the calls nor the result of `get_time` are kept.
    assert_eq!(agent.conversation().get(), [Message::user("Read it")]);

    agent.add_message(Message::user("Never mind")).unwrap();
    agent.send(None).await.unwrap();

    let second = &provider.requests()[1];
    assert_eq!(
        roles(&second.messages),
        [Role::System, Role::User, Role::User]
    );
    assert_calls_answered(&second.messages);
}

#[tokio::test]
async fn test_invalid_arguments() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::tool_calls([ToolCall::function(
            "call_1", "get_time", "{not json",
        )]),
        PresetResponse::reply("unused"),
    ]);
    let mut agent = agent_with(&provider);
    agent.add_message(Message::user("Time?")).unwrap();

    let err = agent.send(None).await.unwrap_err();
    assert!(matches!(
        err,
        Error::ToolArgument { name, .. } if name == "get_time"
    ));
    assert_eq!(provider.request_count(), 1);
    assert_calls_answered(&agent.messages());
    assert_eq!(agent.conversation().len(), 1);
}

#[tokio::test]
async fn test_empty_arguments() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::tool_calls([ToolCall::function(
            "call_1", "get_time", "",
        )]),
        PresetResponse::reply("It is 12:00"),
    ]);
    let mut agent = agent_with(&provider);
    agent.add_message(Message::user("Time?")).unwrap();

    let resp = agent.send(None).await.unwrap();
    assert_eq!(resp.reply(), Some("It is 12:00"));
}

#[tokio::test]
async fn test_tool_failure_is_reported_to_model() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::tool_calls([ToolCall::function(
            "call_1", "flaky", "{}",
        )]),
        PresetResponse::reply("Sorry."),
    ]);
    let mut agent = agent_with(&provider);
    agent
        .register_tool(
            ToolDefinition::new("flaky", "Always fails.", json!({})),
            Arc::new(|_args: Value| {
                let err = tool::Error::execution_error().with_reason("disk full");
                ready(ToolResult::Err(err))
            }),
        )
        .unwrap();
    agent.add_message(Message::user("Try")).unwrap();

    agent.send(None).await.unwrap();
    assert_eq!(
        agent.conversation().get()[2],
        Message::tool("call_1", "Tool call failed: disk full")
    );
}

#[tokio::test]
async fn test_tool_loop_exceeded() {
    let call = || {
        PresetResponse::tool_calls([ToolCall::function(
            "call_1", "get_time", "{}",
        )])
    };
    let provider = TestModelProvider::with_responses([call(), call(), call()]);
    let mut agent = AgentBuilder::with_model_provider(provider.clone())
        .with_model("m")
        .with_max_tool_rounds(1)
        .build();
    agent
        .tool_registry_mut()
        .register(get_time_definition(), get_time)
        .unwrap();
    agent.add_message(Message::user("Time?")).unwrap();

    let err = agent.send(None).await.unwrap_err();
    assert!(matches!(err, Error::ToolLoopExceeded(1)));
    assert_eq!(provider.request_count(), 2);
    // Only the first round made it into the conversation.
    assert_eq!(
        roles(agent.conversation().get()),
        [Role::User, Role::Assistant, Role::Tool]
    );
}

#[tokio::test]
async fn test_empty_tool_calls_are_terminal() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::tool_calls(Vec::new()),
    ]);
    let mut agent = agent_with(&provider);
    agent.add_message(Message::user("Hello")).unwrap();

    agent.send(None).await.unwrap();
    assert_eq!(provider.request_count(), 1);
    assert_eq!(agent.conversation().len(), 2);
}

#[tokio::test]
async fn test_external_tool_calls_are_returned() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::tool_calls([
            ToolCall::function("call_1", "get_time", "{}"),
            ToolCall::function("call_2", "ask_user", "{}"),
        ]),
        PresetResponse::reply("unused"),
    ]);
    let mut agent = agent_with(&provider);
    agent
        .declare_tool(ToolDefinition::new("ask_user", "", json!({})))
        .unwrap();
    agent.add_message(Message::user("Hello")).unwrap();

    let resp = agent.send(None).await.unwrap();
    assert!(resp.wants_tool_calls());
    assert_eq!(provider.request_count(), 1);

    // The local call was answered, the external one was not.
    let stored = agent.conversation().get();
    assert_eq!(roles(stored), [Role::User, Role::Assistant, Role::Tool]);
    assert_eq!(stored[2], Message::tool("call_1", "12:00"));
}

#[tokio::test]
async fn test_transport_error() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::failure(503, "overloaded"),
    ]);
    let mut agent = agent_with(&provider);
    agent.add_message(Message::user("Hello")).unwrap();

    let Err(Error::Transport(err)) = agent.send(None).await else {
        panic!("expected a transport error");
    };
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.kind(), ErrorKind::Status);
    assert_eq!(err.message(), "LLM API returned 503: overloaded");
    assert_eq!(agent.conversation().len(), 1);
}

struct NoChoices;

impl ModelProvider for NoChoices {
    type Error = parley_test_model::Error;

    fn send_request(
        &self,
        _req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, Self::Error>> + Send + 'static
    {
        let mut resp = PresetResponse::reply("").to_response().unwrap();
        resp.choices.clear();
        ready(Ok(resp))
    }
}

#[tokio::test]
async fn test_malformed_response() {
    let mut agent = AgentBuilder::with_model_provider(NoChoices)
        .with_model("m")
        .build();
    agent.add_message(Message::user("Hello")).unwrap();

    let err = agent.send(None).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
    assert_eq!(agent.conversation().len(), 1);
}

#[tokio::test]
async fn test_on_request() {
    let provider = TestModelProvider::with_responses([
        PresetResponse::tool_calls([ToolCall::function(
            "call_1", "get_time", "{}",
        )]),
        PresetResponse::reply("It is 12:00"),
        PresetResponse::reply("Again 12:00"),
    ]);
    let mut agent = agent_with(&provider);

    let all_calls = Arc::new(AtomicUsize::new(0));
    agent.on_request({
        let all_calls = Arc::clone(&all_calls);
        move |_, _| {
            all_calls.fetch_add(1, Ordering::SeqCst);
        }
    });

    // This one removes itself on its first call.
    let once_calls = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::default();
    let subscription = agent.on_request({
        let once_calls = Arc::clone(&once_calls);
        let slot = Arc::clone(&slot);
        move |_, resp| {
            assert!(resp.first_choice().is_some());
            once_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(subscription) = slot.lock().unwrap().as_ref() {
                subscription.unsubscribe();
            }
        }
    });
    *slot.lock().unwrap() = Some(subscription.clone());

    agent.send(None).await.unwrap();
    agent.add_message(Message::user("And now?")).unwrap();
    agent.send(None).await.unwrap();

    assert_eq!(all_calls.load(Ordering::SeqCst), 3);
    assert_eq!(once_calls.load(Ordering::SeqCst), 1);

    // Unsubscribing again does nothing.
    subscription.unsubscribe();
}

#[tokio::test]
async fn test_system_prompt_handling() {
    let provider = TestModelProvider::default();
    let mut agent = agent_with(&provider);

    agent.add_message(Message::user("a")).unwrap();
    assert_eq!(roles(&agent.messages()), [Role::System, Role::User]);

    agent.add_message(Message::system("You are a calendar.")).unwrap();
    assert_eq!(agent.system_prompt(), Some("You are a calendar."));
    assert_eq!(agent.conversation().len(), 1);

    agent
        .set_messages(vec![Message::user("b"), Message::assistant("c")])
        .unwrap();
    assert_eq!(agent.system_prompt(), Some("You are a calendar."));
    assert_eq!(agent.messages()[0], Message::system("You are a calendar."));

    agent
        .set_messages(vec![Message::system("Replaced."), Message::user("d")])
        .unwrap();
    assert_eq!(
        agent.messages(),
        [Message::system("Replaced."), Message::user("d")]
    );

    agent.conversation_mut().lock().unwrap();
    assert!(matches!(
        agent.add_message(Message::system("Nope.")),
        Err(Error::State(StateError::Locked))
    ));
    assert_eq!(agent.system_prompt(), Some("Replaced."));
}
