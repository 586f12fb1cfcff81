//! The streaming event bus (§3, §4.4, §6): a typed, ordered, terminable
//! stream of agent-level events. Only [`crate::agent::react_agent::ReActAgent`]
//! wires this up today (`run_stream`), but the event and channel shapes
//! live here because they are not specific to one agent strategy.

use std::pin::Pin;

use futures_util::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::AgentError;

/// Minimum channel capacity mandated by §5 ("buffer >= 10 events").
pub const MIN_CHANNEL_CAPACITY: usize = 10;

/// Stable string identifiers for [`StreamEvent`] kinds (§6), exposed as
/// constants so callers serializing events to a wire format have one
/// canonical spelling to match against instead of re-deriving it from the
/// enum's `Debug` output.
pub mod event_kind {
    pub const TOKEN: &str = "token";
    pub const THOUGHT: &str = "thought";
    pub const TOOL_START: &str = "tool_start";
    pub const TOOL_END: &str = "tool_end";
    pub const ANSWER: &str = "answer";
    pub const COMPLETE: &str = "complete";
    pub const ERROR: &str = "error";
}

/// One agent-level streaming event. `Complete` and `Error` are terminal:
/// at most one terminal event is emitted per stream and it is the last
/// (§3, §8).
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token { content: String },
    Thought { content: String },
    ToolStart { tool: String, args: Value },
    ToolEnd { tool: String, result: String, is_error: bool },
    Answer { content: String },
    Complete { content: String },
    Error { message: String },
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Token { .. } => event_kind::TOKEN,
            StreamEvent::Thought { .. } => event_kind::THOUGHT,
            StreamEvent::ToolStart { .. } => event_kind::TOOL_START,
            StreamEvent::ToolEnd { .. } => event_kind::TOOL_END,
            StreamEvent::Answer { .. } => event_kind::ANSWER,
            StreamEvent::Complete { .. } => event_kind::COMPLETE,
            StreamEvent::Error { .. } => event_kind::ERROR,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

/// A boxed stream of agent events, the return type of `run_stream`.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, AgentError>> + Send>>;

/// Creates the bounded sender/receiver pair a streaming agent's producer
/// task and consumer use, with the §5-mandated minimum capacity.
pub fn event_channel(capacity: usize) -> (mpsc::Sender<Result<StreamEvent, AgentError>>, AgentEventStream) {
    let capacity = capacity.max(MIN_CHANNEL_CAPACITY);
    let (tx, rx) = mpsc::channel(capacity);
    (tx, Box::pin(ReceiverStream::new(rx)))
}
