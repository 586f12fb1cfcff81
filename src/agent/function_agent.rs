//! Provider-native tool-calling strategy (§4.3): loop `chat()`, dispatch
//! whatever tool calls the model asked for, until it answers with content
//! and no further tool calls.

use std::sync::Arc;
use std::time::Instant;

use crate::context::RunContext;
use crate::error::{AgentError, ToolError};
use crate::message::{Message, Response, ToolCallRecord, ToolOutcome};
use crate::model::BlockingModel;
use crate::tool::ToolRegistry;

#[derive(Debug, Clone)]
pub struct FunctionAgentConfig {
    /// Prepended once, before the first user message, if set. Left unset
    /// by default — unlike `ChatAgent`, this strategy doesn't force a
    /// default persona onto the caller.
    pub system_prompt: Option<String>,
    pub max_iterations: u32,
}

impl Default for FunctionAgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: 5,
        }
    }
}

/// Drives a tool-calling-capable model through a bounded request/dispatch
/// loop. Holds no conversation memory across `run` calls — each call is
/// given its own history, seeded only from `config.system_prompt`.
pub struct FunctionAgent {
    model: Arc<dyn BlockingModel>,
    tools: ToolRegistry,
    config: FunctionAgentConfig,
}

impl FunctionAgent {
    pub fn new(model: Arc<dyn BlockingModel>, tools: ToolRegistry, config: FunctionAgentConfig) -> Self {
        Self { model, tools, config }
    }

    /// Runs the loop to completion for one `user_message`, returning the
    /// final `Response` or an error. Does not retain history between
    /// calls — a fresh history is built every time; this agent carries no
    /// conversation memory (§4.3).
    pub async fn run(&self, ctx: &RunContext, user_message: impl Into<String>) -> Result<Response, AgentError> {
        ctx.check_agent()?;

        let mut history = Vec::new();
        if let Some(system_prompt) = &self.config.system_prompt {
            history.push(Message::system(system_prompt.clone()));
        }
        history.push(Message::user(user_message.into()));

        for iteration in 1..=self.config.max_iterations {
            tracing::debug!(iteration, "function agent: calling model");
            let response = self.model.chat(ctx, &history).await?;

            if response.tool_calls.is_empty() {
                if response.content.is_empty() && !self.tools.is_empty() {
                    tracing::warn!(iteration, "function agent: model returned neither content nor tool calls");
                    return Err(AgentError::InvalidArgument(
                        "model produced no content and no tool calls; it may not support tool calling"
                            .to_string(),
                    ));
                }
                tracing::debug!(iteration, "function agent: final answer");
                let metadata = response
                    .metadata
                    .clone()
                    .merge(
                        crate::message::Metadata::new()
                            .insert("iterations", iteration)
                            .insert("model", self.model.name()),
                    );
                return Ok(Response::new(response.content).with_metadata(metadata));
            }

            tracing::info!(
                iteration,
                count = response.tool_calls.len(),
                tools = ?response.tool_calls.iter().map(|c| &c.name).collect::<Vec<_>>(),
                "function agent: model requested tool calls"
            );

            history.push(Message::assistant_with_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let record = self.dispatch(ctx, call).await;
                let outcome_text = match &record.outcome {
                    Some(ToolOutcome::Success(text)) => text.clone(),
                    Some(ToolOutcome::Error(text)) => text.clone(),
                    None => String::new(),
                };
                history.push(Message::tool_result(call.id.clone(), outcome_text));
            }
        }

        tracing::warn!(max_iterations = self.config.max_iterations, "function agent: iteration limit reached");
        Err(AgentError::IterationLimitExceeded {
            max_iterations: self.config.max_iterations,
        })
    }

    /// Executes one tool call, recording its outcome and elapsed time. A
    /// missing tool is reported back to the model as an observation, not
    /// surfaced as a hard error (§4.2).
    async fn dispatch(&self, ctx: &RunContext, call: &ToolCallRecord) -> ToolCallRecord {
        let started = Instant::now();
        let outcome = match self.tools.get(&call.name) {
            None => {
                tracing::warn!(tool = %call.name, "function agent: tool not found");
                ToolOutcome::Error(format!("tool not found: {}", call.name))
            }
            Some(tool) => match tool.execute(ctx, call.arguments.clone()).await {
                Ok(value) => ToolOutcome::Success(render_value(&value)),
                Err(err) => {
                    tracing::warn!(tool = %call.name, error = %err, "function agent: tool execution failed");
                    ToolOutcome::Error(format_tool_error(err))
                }
            },
        };
        call.clone().with_outcome(outcome, started.elapsed())
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_tool_error(err: ToolError) -> String {
    err.to_string()
}
