//! Memory-bounded multi-turn chat strategy (§4.5): no tool use, just a
//! system prompt, a history, and a compaction policy applied before every
//! model call.

use std::sync::Arc;

use crate::context::RunContext;
use crate::error::AgentError;
use crate::memory::{self, MemoryStrategy};
use crate::message::{Message, Response};
use crate::model::BlockingModel;

#[derive(Clone)]
pub struct ChatAgentConfig {
    pub system_prompt: String,
    pub memory_strategy: MemoryStrategy,
    pub max_messages: usize,
    /// Reused for summarization if unset — the primary model doubles as
    /// its own summarizer.
    pub summarization_model: Option<Arc<dyn BlockingModel>>,
}

impl Default for ChatAgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            memory_strategy: MemoryStrategy::Window,
            max_messages: 20,
            summarization_model: None,
        }
    }
}

/// Optimized for dialogue, not tool use (§4.5) — `add_tool` is a
/// permanent no-op that always errors, signaling that restriction rather
/// than silently ignoring a caller's tool.
pub struct ChatAgent {
    model: Arc<dyn BlockingModel>,
    config: ChatAgentConfig,
    history: Vec<Message>,
}

impl ChatAgent {
    pub fn new(model: Arc<dyn BlockingModel>, config: ChatAgentConfig) -> Self {
        let mut agent = Self { model, config, history: Vec::new() };
        agent.reset();
        agent
    }

    /// Appends the user message, applies the configured memory policy to
    /// the resulting history (replacing it in place — compaction is not
    /// just a view fed to the model, it is what future turns build on),
    /// calls the model, and appends its reply.
    pub async fn run(&mut self, ctx: &RunContext, input: impl Into<String>) -> Result<Response, AgentError> {
        ctx.check_agent()?;
        self.history.push(Message::user(input.into()));

        let summarizer: &dyn BlockingModel = self
            .config
            .summarization_model
            .as_deref()
            .unwrap_or(self.model.as_ref());
        self.history = memory::apply(
            self.config.memory_strategy,
            &self.history,
            self.config.max_messages,
            summarizer,
            ctx,
        )
        .await;

        tracing::debug!(history_len = self.history.len(), "chat agent: calling model");
        let response = self.model.chat(ctx, &self.history).await?;
        self.history.push(Message::assistant(response.content.clone()));
        Ok(response)
    }

    /// Clears history and re-seeds the system message, if configured.
    pub fn reset(&mut self) {
        self.history.clear();
        if !self.config.system_prompt.is_empty() {
            self.history.push(Message::system(self.config.system_prompt.clone()));
        }
    }

    pub fn set_system_prompt(&mut self, system_prompt: impl Into<String>) {
        self.config.system_prompt = system_prompt.into();
        self.reset();
    }

    /// Serializes history as `role: content` lines joined by newlines.
    pub fn export_conversation(&self) -> String {
        self.history
            .iter()
            .map(Message::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Read-only view of the current history, for callers/tests that
    /// want to inspect state without exporting to text.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Permanently unsupported — this agent's conversational focus does
    /// not extend to tool dispatch (§4.5).
    pub fn add_tool(&mut self, _tool: Arc<dyn crate::tool::Tool>) -> Result<(), AgentError> {
        Err(AgentError::Unsupported(
            "ChatAgent does not support tools".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::model::mock::MockModel;

    #[tokio::test]
    async fn remembers_a_fact_across_turns() {
        let model = MockModel::new(
            "m",
            vec![
                Ok(Response::new("Hello Alice!")),
                Ok(Response::new("Your name is Alice.")),
            ],
        );
        let mut agent = ChatAgent::new(Arc::new(model), ChatAgentConfig::default());
        let ctx = RunContext::new();

        agent.run(&ctx, "Hi, I'm Alice").await.unwrap();
        let second = agent.run(&ctx, "What's my name?").await.unwrap();

        assert_eq!(second.content, "Your name is Alice.");
        assert_eq!(agent.history().len(), 5);
    }

    #[tokio::test]
    async fn reset_clears_history_but_reseeds_system_prompt() {
        let model = MockModel::new("m", vec![Ok(Response::new("hi"))]);
        let mut agent = ChatAgent::new(Arc::new(model), ChatAgentConfig::default());
        let ctx = RunContext::new();
        agent.run(&ctx, "hello").await.unwrap();

        agent.reset();
        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history()[0].role, Role::System);
    }

    #[tokio::test]
    async fn set_system_prompt_resets_and_replaces() {
        let model = MockModel::new("m", vec![]);
        let mut agent = ChatAgent::new(Arc::new(model), ChatAgentConfig::default());
        agent.set_system_prompt("Be terse.");
        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history()[0].content, "Be terse.");
    }

    #[tokio::test]
    async fn export_conversation_joins_role_content_lines() {
        let model = MockModel::new("m", vec![Ok(Response::new("hi there"))]);
        let mut agent = ChatAgent::new(Arc::new(model), ChatAgentConfig::default());
        let ctx = RunContext::new();
        agent.run(&ctx, "hello").await.unwrap();

        let exported = agent.export_conversation();
        assert!(exported.contains("system: You are a helpful assistant."));
        assert!(exported.contains("user: hello"));
        assert!(exported.contains("assistant: hi there"));
    }

    #[tokio::test]
    async fn add_tool_is_permanently_unsupported() {
        let model = MockModel::new("m", vec![]);
        let mut agent = ChatAgent::new(Arc::new(model), ChatAgentConfig::default());
        struct Dummy;
        #[async_trait::async_trait]
        impl crate::tool::Tool for Dummy {
            fn name(&self) -> &str { "dummy" }
            fn description(&self) -> &str { "dummy" }
            fn schema(&self) -> &crate::tool::ToolSchema {
                static SCHEMA: std::sync::OnceLock<crate::tool::ToolSchema> = std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| crate::tool::ToolSchema::new("dummy", "dummy", vec![]))
            }
            async fn execute(
                &self,
                _ctx: &RunContext,
                _args: std::collections::HashMap<String, serde_json::Value>,
            ) -> Result<serde_json::Value, crate::error::ToolError> {
                Ok(serde_json::Value::Null)
            }
        }
        let err = agent.add_tool(Arc::new(Dummy)).unwrap_err();
        assert!(matches!(err, AgentError::Unsupported(_)));
    }

    #[tokio::test]
    async fn window_bound_is_enforced_across_turns() {
        crate::test_support::init_tracing();
        let responses = (0..5).map(|i| Ok(Response::new(format!("reply {i}")))).collect();
        let model = MockModel::new("m", responses);
        let config = ChatAgentConfig { max_messages: 5, ..ChatAgentConfig::default() };
        let mut agent = ChatAgent::new(Arc::new(model), config);
        let ctx = RunContext::new();

        for i in 0..5 {
            agent.run(&ctx, format!("turn {i}")).await.unwrap();
            assert!(agent.history().len() <= 6);
            assert_eq!(agent.history()[0].role, Role::System);
            assert_eq!(agent.history().last().unwrap().role, Role::Assistant);
        }
    }
}
