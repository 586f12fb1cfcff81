//! The model interface every agent strategy is built on: [`BlockingModel`]
//! is required, [`StreamingModel`] is an optional capability an agent
//! probes for at runtime via [`BlockingModel::as_streaming`].

pub mod mock;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::context::RunContext;
use crate::error::ModelError;
use crate::message::{Message, Response};

/// A boxed, owned stream of model chunks — the shape both
/// `chat_stream` and `complete_stream` return.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ModelError>> + Send>>;

/// One chunk of a streamed model response.
///
/// Invariants (§3): concatenating `delta` across every non-error chunk in
/// a stream equals the final chunk's `content`; `index` is monotonically
/// non-decreasing; at most one chunk carries a non-empty `finish_reason`
/// and it is the last non-error chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    pub content: String,
    pub delta: String,
    pub index: u32,
    pub finish_reason: Option<String>,
    pub metadata: crate::message::Metadata,
}

impl StreamChunk {
    pub fn new(content: impl Into<String>, delta: impl Into<String>, index: u32) -> Self {
        Self {
            content: content.into(),
            delta: delta.into(),
            index,
            finish_reason: None,
            metadata: crate::message::Metadata::new(),
        }
    }

    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }
}

/// The generator every agent ultimately calls. Implementations may be
/// thin adapters over an HTTP provider (out of this crate's scope — see
/// [`mock`] for the one illustrative implementation kept here for tests),
/// or anything else that can turn a message history into a [`Response`].
#[async_trait]
pub trait BlockingModel: Send + Sync {
    /// A human-readable identifier recorded in `Response::metadata`
    /// (`"model"` key) by the agents that call this model.
    fn name(&self) -> &str;

    async fn chat(&self, ctx: &RunContext, messages: &[Message]) -> Result<Response, ModelError>;

    /// Defined in terms of `chat` with a single user message, returning
    /// content only — the default captures that relationship so most
    /// implementations never need to override it.
    async fn complete(&self, ctx: &RunContext, prompt: &str) -> Result<String, ModelError> {
        let response = self.chat(ctx, &[Message::user(prompt)]).await?;
        Ok(response.content)
    }

    /// Returns `Some(self)` if this model also implements
    /// [`StreamingModel`]. Rust has no structural subtyping, so this is
    /// how an agent probes for the streaming capability at runtime
    /// instead of downcasting a trait object.
    fn as_streaming(&self) -> Option<&dyn StreamingModel> {
        None
    }
}

/// Optional streaming capability. A model implements this in addition to
/// [`BlockingModel`] and overrides `as_streaming` to advertise it.
pub trait StreamingModel: Send + Sync {
    fn chat_stream(&self, ctx: RunContext, messages: Vec<Message>) -> ChunkStream;
    fn complete_stream(&self, ctx: RunContext, prompt: String) -> ChunkStream {
        self.chat_stream(ctx, vec![Message::user(prompt)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_chunk_builder_sets_finish_reason() {
        let chunk = StreamChunk::new("hi", "hi", 0).with_finish_reason("stop");
        assert_eq!(chunk.finish_reason.as_deref(), Some("stop"));
    }
}
