//! Cancellation propagation shared by every model call and tool
//! execution (§5: "every model call and every tool execution may suspend
//! arbitrarily long" and must receive a cancellation-propagating context).

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, ModelError};

/// Carried through a single agent `run`, into every model call and tool
/// `execute`. Cheap to clone — cloning shares the same underlying
/// cancellation signal, it does not fork it.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancellation: CancellationToken,
    /// Reserved for a future wall-clock deadline. Not read anywhere yet —
    /// every suspension point already takes a `RunContext`, so the slot
    /// exists ahead of the enforcement loop that would consume it.
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a token the caller already owns, so a caller
    /// holding a parent token (e.g. a server request scope) can cancel
    /// every agent run it spawned in one shot.
    pub fn from_token(cancellation: CancellationToken) -> Self {
        Self { cancellation, deadline: None }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and anything derived from it via `clone()`.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns `Err` if cancelled, otherwise `Ok(())`. Call at every
    /// suspension point (before a model call, before a tool execution,
    /// before a streamed channel send) per §5's ordering guarantees.
    pub fn check_model(&self) -> Result<(), ModelError> {
        if self.cancellation.is_cancelled() {
            Err(ModelError::Cancelled("run context cancelled".to_string()))
        } else {
            Ok(())
        }
    }

    /// Same check, producing the agent-level error variant for call
    /// sites that haven't gone through a model call yet (e.g. before the
    /// first iteration).
    pub fn check_agent(&self) -> Result<(), AgentError> {
        self.check_model().map_err(AgentError::from)
    }

    /// A future that resolves once this context is cancelled; used to
    /// race against a blocking send on a bounded stream channel so a
    /// stalled consumer plus a cancelled context cannot deadlock (§5
    /// backpressure).
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_cancelled() {
        let ctx = RunContext::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check_model().is_ok());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let ctx = RunContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.check_model().is_err());
    }
}
