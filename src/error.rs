use thiserror::Error;

/// Errors raised by the tool layer: registration, lookup, argument
/// validation, and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid tool registration: {0}")]
    InvalidRegistration(String),
    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ToolError {
    /// Convenience constructor for a tool execution failure carrying an
    /// arbitrary source error.
    pub fn execution(
        tool: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ToolError::Execution {
            tool: tool.into(),
            source: source.into(),
        }
    }
}

/// Errors raised by a [`crate::model::BlockingModel`] or
/// [`crate::model::StreamingModel`] implementation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model returned an invalid response: {0}")]
    Response(String),
    #[error("model call cancelled: {0}")]
    Cancelled(String),
}

/// Errors surfaced by an agent's `run`/`run_stream` entry points.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("max iterations reached ({max_iterations}) without a final answer")]
    IterationLimitExceeded { max_iterations: u32 },
    #[error("agent stream ended without a final response")]
    MissingFinalResponse,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
