//! A scripted [`BlockingModel`] (and optionally [`StreamingModel`])
//! used by this crate's own tests and doctests. Not a provider client —
//! wiring up a real model is an external collaborator's job (§1).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_stream::stream;
use async_trait::async_trait;

use super::{BlockingModel, ChunkStream, StreamChunk, StreamingModel};
use crate::context::RunContext;
use crate::error::ModelError;
use crate::message::{Message, Response};

/// Replays a fixed queue of responses, one per `chat` call, in order.
/// Panics (via `ModelError::Response`) once the queue is exhausted so a
/// test that calls the model more times than it scripted fails loudly
/// instead of hanging.
pub struct MockModel {
    name: String,
    responses: Mutex<VecDeque<Result<Response, ModelError>>>,
    streaming: Option<Vec<Vec<StreamChunk>>>,
    stream_calls: AtomicUsize,
}

impl MockModel {
    pub fn new(name: impl Into<String>, responses: Vec<Result<Response, ModelError>>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::from(responses)),
            streaming: None,
            stream_calls: AtomicUsize::new(0),
        }
    }

    /// Attaches a scripted chunk stream per call, enabling the
    /// [`StreamingModel`] capability. `chunk_sets[i]` is replayed on the
    /// `i`-th call to `chat_stream`/`complete_stream`.
    pub fn with_streaming(mut self, chunk_sets: Vec<Vec<StreamChunk>>) -> Self {
        self.streaming = Some(chunk_sets);
        self
    }

    fn next_response(&self) -> Result<Response, ModelError> {
        let mut guard = self.responses.lock().expect("mock model lock poisoned");
        guard
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Response("no more scripted responses".to_string())))
    }
}

#[async_trait]
impl BlockingModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, ctx: &RunContext, _messages: &[Message]) -> Result<Response, ModelError> {
        ctx.check_model()?;
        self.next_response()
    }

    fn as_streaming(&self) -> Option<&dyn StreamingModel> {
        if self.streaming.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl StreamingModel for MockModel {
    fn chat_stream(&self, ctx: RunContext, _messages: Vec<Message>) -> ChunkStream {
        let chunk_sets = self.streaming.clone().unwrap_or_default();
        let call_index = self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let chunks = chunk_sets.get(call_index).cloned().unwrap_or_default();

        Box::pin(stream! {
            for chunk in chunks {
                if ctx.is_cancelled() {
                    yield Err(ModelError::Cancelled("run context cancelled".to_string()));
                    return;
                }
                yield Ok(chunk);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_scripted_responses_in_order() {
        let model = MockModel::new(
            "mock",
            vec![
                Ok(Response::new("first")),
                Ok(Response::new("second")),
            ],
        );
        let ctx = RunContext::new();

        let first = model.chat(&ctx, &[]).await.unwrap();
        let second = model.chat(&ctx, &[]).await.unwrap();
        assert_eq!(first.content, "first");
        assert_eq!(second.content, "second");
    }

    #[tokio::test]
    async fn exhausted_queue_errors_instead_of_hanging() {
        let model = MockModel::new("mock", vec![]);
        let ctx = RunContext::new();
        assert!(model.chat(&ctx, &[]).await.is_err());
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits_chat() {
        let model = MockModel::new("mock", vec![Ok(Response::new("unused"))]);
        let ctx = RunContext::new();
        ctx.cancel();
        assert!(matches!(
            model.chat(&ctx, &[]).await,
            Err(ModelError::Cancelled(_))
        ));
    }
}
