use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use parley_model::{
    ChatResponse, Message, RequestConfig, Role, ToolDefinition,
};

use crate::tool::ToolHandler;
use crate::{ChatAgent, Result};

/// Keeps at most `size` non-system messages in the inner agent, evicting
/// the oldest ones first.
///
/// The history is trimmed before and after each `send`, and room is made
/// before each added message, so the bound holds after every call. A tool
/// result left at the head of the window without the assistant message
/// that requested it is evicted as well.
///
/// Tool results are the exception: adding one makes no room, and a round
/// still waiting for the model (an assistant message with tool calls
/// followed by their results) is sent whole even if it exceeds the window.
/// The trim after `send` restores the bound.
pub struct SlidingWindow<A> {
    inner: A,
    size: NonZeroUsize,
}

impl<A: ChatAgent> SlidingWindow<A> {
    /// Wraps `inner` with a window of `size` messages.
    #[inline]
    pub fn new(inner: A, size: NonZeroUsize) -> Self {
        Self { inner, size }
    }

    /// Returns the window size.
    #[inline]
    pub fn size(&self) -> NonZeroUsize {
        self.size
    }

    /// Returns the wrapped agent.
    #[inline]
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Returns the wrapped agent for mutation.
    #[inline]
    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.inner
    }

    fn trim_to(&mut self, size: usize, keep_pending: bool) -> Result<()> {
        let (system, rest): (Vec<_>, Vec<_>) = self
            .inner
            .messages()
            .into_iter()
            .partition(Message::is_system);
        let mut kept = recent(&rest, size);
        if let Some(round) = pending_round(&rest)
            .filter(|round| keep_pending && round.len() > kept.len())
        {
            kept = round;
        }
        if kept.len() == rest.len() {
            return Ok(());
        }

        debug!("evicting {} messages", rest.len() - kept.len());
        let mut messages = system;
        messages.extend_from_slice(kept);
        self.inner.set_messages(messages)
    }
}

/// Returns the trailing tool round, if its results were not answered by
/// the model yet.
fn pending_round(messages: &[Message]) -> Option<&[Message]> {
    if messages.last()?.role() != Role::Tool {
        return None;
    }
    let start = messages
        .iter()
        .rposition(|message| !message.tool_calls().is_empty())?;
    Some(&messages[start..])
}

/// Returns the last `size` messages, minus leading orphaned tool results.
fn recent(messages: &[Message], size: usize) -> &[Message] {
    let mut start = messages.len().saturating_sub(size);
    while messages
        .get(start)
        .is_some_and(|message| message.role() == Role::Tool)
    {
        start += 1;
    }
    &messages[start..]
}

#[async_trait]
impl<A: ChatAgent> ChatAgent for SlidingWindow<A> {
    fn add_message(&mut self, message: Message) -> Result<()> {
        if !message.is_system() && message.role() != Role::Tool {
            self.trim_to(self.size.get() - 1, false)?;
        }
        self.inner.add_message(message)
    }

    #[inline]
    fn messages(&self) -> Vec<Message> {
        self.inner.messages()
    }

    #[inline]
    fn set_messages(&mut self, messages: Vec<Message>) -> Result<()> {
        self.inner.set_messages(messages)
    }

    #[inline]
    fn config(&self) -> RequestConfig {
        self.inner.config()
    }

    #[inline]
    fn set_config(&mut self, config: RequestConfig) -> Result<()> {
        self.inner.set_config(config)
    }

    #[inline]
    fn tools(&self) -> Vec<ToolDefinition> {
        self.inner.tools()
    }

    #[inline]
    fn register_tool(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        self.inner.register_tool(definition, handler)
    }

    #[inline]
    fn declare_tool(&mut self, definition: ToolDefinition) -> Result<()> {
        self.inner.declare_tool(definition)
    }

    async fn send(
        &mut self,
        config_override: Option<RequestConfig>,
    ) -> Result<ChatResponse> {
        let size = self.size.get();
        self.trim_to(size, true)?;
        let result = self.inner.send(config_override).await;
        let trimmed = self.trim_to(size, false);
        let resp = result?;
        trimmed?;
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use parley_model::ToolCall;
    use parley_test_model::{PresetResponse, TestModelProvider};

    use super::*;
    use crate::{Agent, AgentBuilder};

    fn window(provider: &TestModelProvider, size: usize) -> SlidingWindow<Agent> {
        let agent = AgentBuilder::with_model_provider(provider.clone())
            .with_system_prompt("sys")
            .with_model("m")
            .build();
        SlidingWindow::new(agent, NonZeroUsize::new(size).unwrap())
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(Message::content).collect()
    }

    #[test]
    fn test_add_message_evicts_oldest() {
        let mut agent = window(&TestModelProvider::default(), 3);

        let texts: Vec<String> = (0..10).map(|i| format!("m{i}")).collect();
        for (i, text) in texts.iter().enumerate() {
            agent.add_message(Message::user(text.as_str())).unwrap();

            let stored = agent.inner().conversation().get();
            let start = (i + 1).saturating_sub(3);
            let expected: Vec<&str> =
                texts[start..=i].iter().map(String::as_str).collect();
            assert_eq!(contents(stored), expected);
        }
        assert_eq!(agent.messages()[0], Message::system("sys"));
    }

    #[test]
    fn test_system_messages_are_not_counted() {
        let mut agent = window(&TestModelProvider::default(), 1);
        agent.add_message(Message::user("a")).unwrap();
        agent.add_message(Message::system("new sys")).unwrap();
        agent.add_message(Message::user("b")).unwrap();

        assert_eq!(
            agent.messages(),
            [Message::system("new sys"), Message::user("b")]
        );
    }

    #[tokio::test]
    async fn test_send_trims_before_and_after() {
        let provider =
            TestModelProvider::with_responses([PresetResponse::reply("r")]);
        let mut agent = window(&provider, 2);
        for text in ["a", "b", "c", "d"] {
            agent
                .inner_mut()
                .conversation_mut()
                .append(Message::user(text))
                .unwrap();
        }

        agent.send(None).await.unwrap();

        let sent = &provider.requests()[0].messages;
        assert_eq!(contents(sent), ["sys", "c", "d"]);
        assert_eq!(contents(agent.inner().conversation().get()), ["d", "r"]);
    }

    #[tokio::test]
    async fn test_orphaned_tool_results_are_evicted() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::tool_calls([ToolCall::function(
                "call_1", "ask", "{}",
            )]),
        ]);
        let mut agent = window(&provider, 2);
        agent
            .declare_tool(ToolDefinition::new("ask", "", Default::default()))
            .unwrap();
        agent.add_message(Message::user("q")).unwrap();
        agent.send(None).await.unwrap();

        // Adding the result makes no room.
        agent.add_message(Message::tool("call_1", "answer")).unwrap();
        assert_eq!(
            agent.inner().conversation().get()[2],
            Message::tool("call_1", "answer")
        );

        // Pushing the assistant message out leaves its result orphaned.
        agent.add_message(Message::user("next")).unwrap();
        assert_eq!(contents(agent.inner().conversation().get()), ["next"]);
    }

    #[tokio::test]
    async fn test_pending_round_is_sent_whole() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::tool_calls([
                ToolCall::function("call_1", "ask", "{}"),
                ToolCall::function("call_2", "ask", "{}"),
            ]),
            PresetResponse::reply("done"),
        ]);
        let mut agent = window(&provider, 1);
        agent
            .declare_tool(ToolDefinition::new("ask", "", Default::default()))
            .unwrap();
        agent.add_message(Message::user("q")).unwrap();
        agent.send(None).await.unwrap();
        assert_eq!(agent.inner().conversation().len(), 1);

        agent.add_message(Message::tool("call_1", "a1")).unwrap();
        agent.add_message(Message::tool("call_2", "a2")).unwrap();
        agent.send(None).await.unwrap();

        let roles: Vec<_> = provider.requests()[1]
            .messages
            .iter()
            .map(Message::role)
            .collect();
        assert_eq!(
            roles,
            [Role::System, Role::Assistant, Role::Tool, Role::Tool]
        );
        assert_eq!(contents(agent.inner().conversation().get()), ["done"]);
    }

    #[test]
    fn test_pending_round() {
        let call = ToolCall::function("1", "ask", "{}");
        let messages = [
            Message::user("a"),
            Message::assistant_tool_calls(vec![call]),
            Message::tool("1", "t1"),
        ];
        assert_eq!(pending_round(&messages), Some(&messages[1..]));
        assert_eq!(pending_round(&messages[..2]), None);
        assert_eq!(pending_round(&[]), None);
    }

    #[test]
    fn test_recent() {
        let messages = [
            Message::user("a"),
            Message::assistant_tool_calls(vec![]),
            Message::tool("1", "t1"),
            Message::tool("2", "t2"),
            Message::assistant("b"),
        ];
        assert_eq!(recent(&messages, 10).len(), 5);
        assert_eq!(contents(recent(&messages, 3)), ["b"]);
        assert_eq!(recent(&messages, 4).len(), 4);
        assert!(recent(&messages, 0).is_empty());
    }
}
