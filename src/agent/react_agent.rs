//! Textual reason-act strategy (§4.4): the model narrates a
//! `Thought`/`Action`/`Observation` loop in plain text, which this module
//! parses and drives rather than relying on provider-native tool calls.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tokio::sync::mpsc::Sender;

use crate::context::RunContext;
use crate::error::{AgentError, ModelError, ToolError};
use crate::message::{Message, Metadata, ReasoningStep, ReasoningTrace, Response};
use crate::model::BlockingModel;
use crate::stream::{event_channel, AgentEventStream, StreamEvent};
use crate::tool::ToolRegistry;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a careful problem-solving agent. Work through the task step by \
step using the tools available to you. Use exactly this format:\n\n\
Thought: <your reasoning about what to do next>\n\
Action: <tool_name>(<key>=<value>, <key>=<value>, ...)\n\
Observation: <the tool's result — this will be provided to you, do not write it yourself>\n\
... (Thought/Action/Observation can repeat)\n\
Thought: <your final reasoning>\n\
Final Answer: <your answer to the question>\n\n\
Only ever emit one Action per response. When you have enough information, \
skip straight to Final Answer.";

#[derive(Debug, Clone)]
pub struct ReActAgentConfig {
    pub system_prompt: Option<String>,
    pub max_iterations: u32,
}

impl Default for ReActAgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: 10,
        }
    }
}

pub struct ReActAgent {
    model: Arc<dyn BlockingModel>,
    tools: ToolRegistry,
    config: ReActAgentConfig,
}

struct ParsedOutput {
    thought: Option<String>,
    action: Option<(String, String)>,
    final_answer: Option<String>,
}

fn thought_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?mi)^\s*thought:\s*(.+)$").unwrap())
}

fn action_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?mi)^\s*action:\s*([A-Za-z0-9_]+)\((.*)\)\s*$").unwrap())
}

fn final_answer_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)final answer:\s*(.+)").unwrap())
}

fn parse_output(text: &str) -> ParsedOutput {
    let thought = thought_regex()
        .captures(text)
        .map(|c| c[1].trim().to_string());
    let final_answer = final_answer_regex()
        .captures(text)
        .map(|c| c[1].trim().to_string());
    let action = if final_answer.is_some() {
        None
    } else {
        action_regex()
            .captures(text)
            .map(|c| (c[1].to_string(), c[2].to_string()))
    };

    ParsedOutput { thought, action, final_answer }
}

/// Splits a raw `key=value, key=value` action argument list on
/// commas that are not inside a quoted span, tolerating single or
/// double quotes. Every value is returned as a string; callers that need
/// a different logical type parse it themselves.
fn split_args(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
            }
            None if c == ',' => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            None => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if value.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

fn parse_args(raw: &str) -> HashMap<String, Value> {
    let mut args = HashMap::new();
    for part in split_args(raw) {
        if let Some((key, value)) = part.split_once('=') {
            args.insert(key.trim().to_string(), Value::String(unquote(value.trim())));
        }
    }
    args
}

impl ReActAgent {
    pub fn new(model: Arc<dyn BlockingModel>, tools: ToolRegistry, config: ReActAgentConfig) -> Self {
        Self { model, tools, config }
    }

    fn system_prompt(&self) -> String {
        let base = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        if self.tools.is_empty() {
            return base;
        }
        let mut catalog = String::from("\n\nAvailable tools:\n");
        for tool in self.tools.sorted() {
            catalog.push_str(&tool.schema().to_prompt_text());
        }
        format!("{base}{catalog}")
    }

    fn initial_history(&self, question: &str) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(format!("{question}\n\nLet's approach this step-by-step.")),
        ]
    }

    /// Looks up and executes the named tool, stringifying either its
    /// success value or its error into a single observation — a missing
    /// tool or a failing one both become text fed back to the model, not
    /// a hard error (§4.2). The returned `bool` is `true` when the
    /// observation represents a failure, for callers that want to report
    /// it (e.g. `tool_end` events) without re-parsing the text.
    async fn execute_action(&self, ctx: &RunContext, name: &str, args: HashMap<String, Value>) -> (String, bool) {
        match self.tools.get(name) {
            None => (format!("tool not found: {name}"), true),
            Some(tool) => match tool.execute(ctx, args).await {
                Ok(value) => (render_value(&value), false),
                Err(err) => (format_tool_error(err), true),
            },
        }
    }

    /// Runs the reason-act loop to completion, blocking on `model.chat`
    /// once per iteration.
    pub async fn run(&self, ctx: &RunContext, question: impl Into<String>) -> Result<Response, AgentError> {
        ctx.check_agent()?;
        let question = question.into();
        let mut history = self.initial_history(&question);
        let mut trace = ReasoningTrace::default();

        for iteration in 1..=self.config.max_iterations {
            ctx.check_agent()?;
            tracing::debug!(iteration, "react agent: calling model");
            let raw = self.model.chat(ctx, &history).await?.content;
            history.push(Message::assistant(raw.clone()));

            let parsed = parse_output(&raw);
            let mut step = ReasoningStep {
                iteration,
                thought: parsed.thought.clone().unwrap_or_default(),
                ..Default::default()
            };

            if let Some(answer) = parsed.final_answer {
                tracing::debug!(iteration, "react agent: final answer");
                trace.push(step);
                return Ok(self.finish(answer, iteration, trace));
            }

            match parsed.action {
                Some((name, raw_args)) => {
                    let args = parse_args(&raw_args);
                    tracing::info!(iteration, tool = %name, "react agent: dispatching action");
                    let (observation, _is_error) = self.execute_action(ctx, &name, args.clone()).await;
                    step.action = Some(name);
                    step.action_args = args;
                    step.observation = Some(observation.clone());
                    trace.push(step);
                    history.push(Message::user(format!("Observation: {observation}")));
                }
                None => {
                    tracing::warn!(iteration, "react agent: malformed or absent action, retrying");
                    // Malformed or absent action: neither action nor
                    // answer. The raw output is already in history; loop
                    // continues so the model can try again.
                    trace.push(step);
                }
            }
        }

        tracing::warn!(max_iterations = self.config.max_iterations, "react agent: iteration limit reached");
        Err(AgentError::IterationLimitExceeded {
            max_iterations: self.config.max_iterations,
        })
    }

    fn finish(&self, content: String, iterations: u32, trace: ReasoningTrace) -> Response {
        let metadata = Metadata::new()
            .insert("iterations", iterations)
            .insert("model", self.model.name())
            .insert(
                "reasoning_trace",
                serde_json::to_value(&trace).unwrap_or(Value::Null),
            );
        Response::new(content).with_metadata(metadata)
    }

    /// Streaming variant (§4.4, §5): spawns one producer task writing to a
    /// bounded channel (capacity >= 10), emitting `thought`/`tool_start`/
    /// `tool_end`/`answer` events every iteration and `token` events only
    /// when the model also implements `StreamingModel`. Exactly one
    /// terminal event (`complete` or `error`) is emitted last.
    pub fn run_stream(self: Arc<Self>, ctx: RunContext, question: impl Into<String>) -> AgentEventStream {
        let question = question.into();
        let (tx, stream) = event_channel(10);

        tokio::spawn(async move {
            let result = self.drive_stream(&ctx, &question, &tx).await;
            let terminal = match result {
                Ok(content) => StreamEvent::Complete { content },
                Err(err) => StreamEvent::Error { message: err.to_string() },
            };
            tokio::select! {
                _ = tx.send(Ok(terminal)) => {}
                _ = ctx.cancelled() => {}
            }
        });

        stream
    }

    async fn drive_stream(
        &self,
        ctx: &RunContext,
        question: &str,
        tx: &Sender<Result<StreamEvent, AgentError>>,
    ) -> Result<String, AgentError> {
        ctx.check_agent()?;
        let mut history = self.initial_history(question);
        let streaming = self.model.as_streaming();

        for _iteration in 1..=self.config.max_iterations {
            ctx.check_agent()?;

            let raw = match streaming {
                Some(streaming_model) => {
                    use futures_util::StreamExt;
                    let mut chunks = streaming_model.chat_stream(ctx.clone(), history.clone());
                    let mut content = String::new();
                    while let Some(chunk) = chunks.next().await {
                        let chunk = chunk?;
                        if !chunk.delta.is_empty() {
                            send_event(tx, ctx, StreamEvent::Token { content: chunk.delta.clone() }).await?;
                        }
                        content = chunk.content;
                    }
                    content
                }
                None => self.model.chat(ctx, &history).await?.content,
            };
            history.push(Message::assistant(raw.clone()));

            let parsed = parse_output(&raw);
            if let Some(thought) = &parsed.thought {
                send_event(tx, ctx, StreamEvent::Thought { content: thought.clone() }).await?;
            }

            if let Some(answer) = parsed.final_answer {
                send_event(tx, ctx, StreamEvent::Answer { content: answer.clone() }).await?;
                return Ok(answer);
            }

            if let Some((name, raw_args)) = parsed.action {
                let args = parse_args(&raw_args);
                send_event(
                    tx,
                    ctx,
                    StreamEvent::ToolStart { tool: name.clone(), args: serde_json::json!(args) },
                )
                .await?;

                let (observation, is_error) = self.execute_action(ctx, &name, args).await;
                send_event(
                    tx,
                    ctx,
                    StreamEvent::ToolEnd { tool: name, result: observation.clone(), is_error },
                )
                .await?;
                history.push(Message::user(format!("Observation: {observation}")));
            }
        }

        tracing::warn!(max_iterations = self.config.max_iterations, "react agent stream: iteration limit reached");
        Err(AgentError::IterationLimitExceeded {
            max_iterations: self.config.max_iterations,
        })
    }
}

/// Sends one event, racing the send against `ctx`'s cancellation signal
/// (§5: "the producer must interleave every send with a cancellation
/// check so a stalled consumer plus a cancelled context does not
/// deadlock"). A bounded channel's `send` only suspends when the consumer
/// isn't draining it, so without this race a cancelled run whose consumer
/// has stopped polling would hang here forever instead of returning.
async fn send_event(
    tx: &Sender<Result<StreamEvent, AgentError>>,
    ctx: &RunContext,
    event: StreamEvent,
) -> Result<(), AgentError> {
    tokio::select! {
        result = tx.send(Ok(event)) => result
            .map_err(|_| AgentError::Unsupported("stream consumer dropped".to_string())),
        _ = ctx.cancelled() => {
            Err(AgentError::from(ModelError::Cancelled("run context cancelled".to_string())))
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_tool_error(err: ToolError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as Map;

    use async_trait::async_trait;
    use futures_util::StreamExt;

    use super::*;
    use crate::model::mock::MockModel;
    use crate::tool::{ParamType, Tool, ToolParameter, ToolSchema};

    struct Calculator {
        schema: ToolSchema,
    }

    impl Calculator {
        fn new() -> Self {
            Self {
                schema: ToolSchema::new(
                    "calculator",
                    "performs arithmetic",
                    vec![
                        ToolParameter::new("operation", ParamType::String, "op").required(),
                        ToolParameter::new("a", ParamType::Number, "first").required(),
                        ToolParameter::new("b", ParamType::Number, "second").required(),
                    ],
                ),
            }
        }
    }

    #[async_trait]
    impl Tool for Calculator {
        fn name(&self) -> &str {
            "calculator"
        }
        fn description(&self) -> &str {
            "performs arithmetic"
        }
        fn schema(&self) -> &ToolSchema {
            &self.schema
        }
        async fn execute(&self, _ctx: &RunContext, _args: Map<String, Value>) -> Result<Value, ToolError> {
            Ok(Value::String("100".to_string()))
        }
    }

    fn registry_with_calculator() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Calculator::new())).unwrap();
        registry
    }

    #[test]
    fn parses_thought_and_final_answer() {
        let parsed = parse_output("Thought: trivial\nFinal Answer: 42");
        assert_eq!(parsed.thought.as_deref(), Some("trivial"));
        assert_eq!(parsed.final_answer.as_deref(), Some("42"));
        assert!(parsed.action.is_none());
    }

    #[test]
    fn parses_action_with_quoted_argument_containing_a_comma() {
        let parsed = parse_output("Thought: need math\nAction: calculator(operation=multiply, a=25, b=4)");
        let (name, raw_args) = parsed.action.unwrap();
        assert_eq!(name, "calculator");
        let args = parse_args(&raw_args);
        assert_eq!(args.get("operation"), Some(&Value::String("multiply".to_string())));
        assert_eq!(args.get("a"), Some(&Value::String("25".to_string())));
    }

    #[test]
    fn final_answer_wins_over_action_in_same_response() {
        let parsed = parse_output("Action: calculator(a=1,b=2)\nFinal Answer: done");
        assert!(parsed.action.is_none());
        assert_eq!(parsed.final_answer.as_deref(), Some("done"));
    }

    #[test]
    fn malformed_action_yields_neither_action_nor_answer() {
        let parsed = parse_output("Thought: hm\nAction: calculator(a=1,b=2");
        assert!(parsed.action.is_none());
        assert!(parsed.final_answer.is_none());
    }

    #[tokio::test]
    async fn single_final_answer_on_first_call() {
        let model = MockModel::new("m", vec![Ok(Response::new("Thought: trivial\nFinal Answer: 42"))]);
        let agent = ReActAgent::new(Arc::new(model), ToolRegistry::new(), ReActAgentConfig::default());
        let ctx = RunContext::new();
        let response = agent.run(&ctx, "What is the answer?").await.unwrap();
        assert_eq!(response.content, "42");

        let trace: ReasoningTrace =
            serde_json::from_value(response.metadata.get("reasoning_trace").unwrap().clone()).unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.steps[0].thought, "trivial");
    }

    #[tokio::test]
    async fn runs_a_tool_then_answers() {
        crate::test_support::init_tracing();
        let model = MockModel::new(
            "m",
            vec![
                Ok(Response::new("Thought: need math\nAction: calculator(operation=multiply, a=25, b=4)")),
                Ok(Response::new("Thought: done\nFinal Answer: 100")),
            ],
        );
        let agent = ReActAgent::new(Arc::new(model), registry_with_calculator(), ReActAgentConfig::default());
        let ctx = RunContext::new();
        let response = agent.run(&ctx, "25 times 4").await.unwrap();
        assert_eq!(response.content, "100");

        let trace: ReasoningTrace =
            serde_json::from_value(response.metadata.get("reasoning_trace").unwrap().clone()).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.steps[0].action.as_deref(), Some("calculator"));
        assert_eq!(trace.steps[0].observation.as_deref(), Some("100"));
    }

    #[tokio::test]
    async fn iteration_cap_is_reported() {
        let responses = (0..3).map(|_| Ok(Response::new("Thought: still thinking"))).collect();
        let model = MockModel::new("m", responses);
        let config = ReActAgentConfig { max_iterations: 3, ..Default::default() };
        let agent = ReActAgent::new(Arc::new(model), ToolRegistry::new(), config);
        let ctx = RunContext::new();
        let err = agent.run(&ctx, "go").await.unwrap_err();
        assert!(matches!(err, AgentError::IterationLimitExceeded { max_iterations: 3 }));
    }

    #[tokio::test]
    async fn stream_emits_exactly_one_terminal_event_last() {
        let model = MockModel::new("m", vec![Ok(Response::new("Thought: trivial\nFinal Answer: 42"))]);
        let agent = Arc::new(ReActAgent::new(Arc::new(model), ToolRegistry::new(), ReActAgentConfig::default()));
        let ctx = RunContext::new();
        let mut stream = agent.run_stream(ctx, "What is the answer?");

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.unwrap());
        }

        let terminal_count = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminal_count, 1);
        assert!(events.last().unwrap().is_terminal());
    }
}
