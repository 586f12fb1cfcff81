//! The three agent strategies (§4.3–§4.5), sharing `Message`, the model
//! interface, the tool registry, and `RunContext` but otherwise
//! independent: each owns its own history and control flow.

pub mod chat_agent;
pub mod function_agent;
pub mod react_agent;

pub use chat_agent::{ChatAgent, ChatAgentConfig};
pub use function_agent::{FunctionAgent, FunctionAgentConfig};
pub use react_agent::{ReActAgent, ReActAgentConfig};
