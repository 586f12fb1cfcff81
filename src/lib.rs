//! # agentrun-rs
//!
//! Agent runtime core: a polymorphic model interface, a typed tool
//! registry, a streaming event bus, and three agent strategies built on
//! top of them — [`FunctionAgent`] (provider-native tool calling),
//! [`ReActAgent`] (textual reason-act), and [`ChatAgent`] (memory-bounded
//! conversation). Provider wire formats, a concrete tool catalog, and
//! persistent storage are out of scope: this crate is the shared core an
//! application wires a real model client and tools into.
//!
//! ## Quickstart
//! ```rust,no_run
//! use std::sync::Arc;
//! use agentrun_rs::{FunctionAgent, FunctionAgentConfig, ToolRegistry, RunContext};
//! # use agentrun_rs::model::mock::MockModel;
//! # use agentrun_rs::Response;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let model = Arc::new(MockModel::new("demo", vec![Ok(Response::new("42"))]));
//! let agent = FunctionAgent::new(model, ToolRegistry::new(), FunctionAgentConfig::default());
//!
//! let ctx = RunContext::new();
//! let response = agent.run(&ctx, "What is six times seven?").await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```
//!
//! ## Streaming a ReAct run
//! ```rust,no_run
//! use std::sync::Arc;
//! use agentrun_rs::{ReActAgent, ReActAgentConfig, ToolRegistry, RunContext, StreamEvent};
//! use futures_util::StreamExt;
//! # use agentrun_rs::model::mock::MockModel;
//! # use agentrun_rs::Response;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let model = Arc::new(MockModel::new("demo", vec![Ok(Response::new("Thought: done\nFinal Answer: 42"))]));
//! let agent = Arc::new(ReActAgent::new(model, ToolRegistry::new(), ReActAgentConfig::default()));
//!
//! let mut stream = agent.run_stream(RunContext::new(), "What is the answer?");
//! while let Some(event) = stream.next().await {
//!     if let StreamEvent::Answer { content } = event? {
//!         println!("{content}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// The three agent strategies: [`agent::FunctionAgent`], [`agent::ReActAgent`], [`agent::ChatAgent`].
pub mod agent;
/// Cancellation propagation shared by every model call and tool execution.
pub mod context;
/// Error types returned by tools, models, and agent runs.
pub mod error;
/// Memory compaction policies applied before each `ChatAgent` model call.
pub mod memory;
/// Canonical conversation and response types.
pub mod message;
/// The polymorphic blocking/streaming model interface.
pub mod model;
/// The streaming event bus agents emit during a `run_stream` call.
pub mod stream;
/// Tool schema, the `Tool` trait, and the per-agent `ToolRegistry`.
pub mod tool;

pub use agent::{
    ChatAgent, ChatAgentConfig, FunctionAgent, FunctionAgentConfig, ReActAgent, ReActAgentConfig,
};
pub use context::RunContext;
pub use error::{AgentError, ModelError, ToolError};
pub use memory::MemoryStrategy;
pub use message::{Message, ReasoningStep, ReasoningTrace, Response, Role, ToolCallRecord};
pub use model::{BlockingModel, StreamChunk, StreamingModel};
pub use stream::{AgentEventStream, StreamEvent};
pub use tool::{ParamType, Tool, ToolParameter, ToolRegistry, ToolSchema};

/// Test-only tracing setup. `RUST_LOG=agentrun_rs=debug cargo test -- --nocapture`
/// shows the `tracing` events emitted by the agents and memory policies.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub fn init_tracing() {
        INIT.call_once(|| {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_test_writer()
                .try_init();
        });
    }
}
