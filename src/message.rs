//! Canonical conversation and response types shared by every agent
//! strategy: [`Message`], [`ToolCallRecord`], [`Response`], and the
//! [`ReasoningTrace`] the ReAct agent populates.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

/// Free-form key/value metadata carried on a [`Message`] or [`Response`].
///
/// A thin wrapper over a JSON object rather than a bare `serde_json::Map`
/// so call sites read as `Metadata::new()` / `meta.is_empty()` instead of
/// repeating `serde_json::Map::new()` everywhere a message is built.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Metadata(pub HashMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts every entry from `other`, overwriting keys already present.
    /// Used to layer agent-level metadata (iteration count) on top of
    /// whatever a model already set (finish reason, token counts) without
    /// discarding it.
    pub fn merge(mut self, other: Metadata) -> Self {
        self.0.extend(other.0);
        self
    }
}

/// The role a [`Message`] was spoken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversation turn.
///
/// Invariants (enforced by the constructors below, not by the fields
/// being private — callers that build a `Message` by hand are expected to
/// uphold them too):
/// - `role == Role::Tool` implies `tool_call_id` is `Some` and non-empty.
/// - `role == Role::Assistant` with a non-empty `tool_calls` implies every
///   call in it has a unique `id` within the turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub name: Option<String>,
    pub tool_call_id: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub metadata: Metadata,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Builds an assistant turn that requested one or more tool calls.
    /// Panics in debug builds only if two calls share an `id` — callers
    /// control id generation and a collision there is a programming error,
    /// not a runtime condition to recover from.
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRecord>,
    ) -> Self {
        debug_assert!(
            {
                let mut ids: Vec<&str> = tool_calls.iter().map(|c| c.id.as_str()).collect();
                ids.sort_unstable();
                ids.windows(2).all(|pair| pair[0] != pair[1])
            },
            "tool call ids must be unique within one assistant turn"
        );
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls,
            metadata: Metadata::new(),
        }
    }

    /// Builds a tool-result turn linked back to the call that produced it.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let tool_call_id = tool_call_id.into();
        debug_assert!(!tool_call_id.is_empty(), "tool_call_id must be non-empty");
        Self {
            role: Role::Tool,
            content: content.into(),
            name: None,
            tool_call_id: Some(tool_call_id),
            tool_calls: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Renders as `role: content`, the line format [`Response::export`]-style
    /// transcripts and the summarize memory policy both use.
    pub fn to_line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// The outcome of executing one tool call: either the textual value a
/// tool produced, or the error it failed with (stringified — §4.2, tools
/// are responsible for their own error reporting, the runtime only needs
/// a string to feed back to the model).
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(String),
    Error(String),
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ToolOutcome::Success(s) | ToolOutcome::Error(s) => s,
        }
    }
}

/// Record of a model's request to invoke a tool, plus (once execution
/// completes) its outcome and elapsed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: HashMap<String, Value>,
    pub outcome: Option<ToolOutcome>,
    pub duration: Option<Duration>,
}

impl ToolCallRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: HashMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            outcome: None,
            duration: None,
        }
    }

    pub fn with_outcome(mut self, outcome: ToolOutcome, duration: Duration) -> Self {
        self.outcome = Some(outcome);
        self.duration = Some(duration);
        self
    }
}

/// An agent's terminal output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub metadata: Metadata,
}

impl Response {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRecord>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One iteration of a ReAct run: the thought that drove it, the action
/// taken (if any), and the observation that came back.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ReasoningStep {
    pub iteration: u32,
    pub thought: String,
    pub action: Option<String>,
    pub action_args: HashMap<String, Value>,
    pub observation: Option<String>,
}

/// Ordered record of a ReAct run's thought/action/observation tuples,
/// reset at the start of every `run`/`run_stream` call.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReasoningTrace {
    pub steps: Vec<ReasoningStep>,
}

impl ReasoningTrace {
    pub fn push(&mut self, step: ReasoningStep) {
        self.steps.push(step);
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
