//! Memory compaction policies applied before each [`crate::agent::chat_agent::ChatAgent`]
//! model call (§4.6). All four strategies preserve the same invariants:
//! position 0 stays the system message if it was one, and the in-flight
//! assistant reply is appended only after the policy has run.

use crate::context::RunContext;
use crate::message::{Message, Role};
use crate::model::BlockingModel;

/// Which compaction policy a [`crate::agent::chat_agent::ChatAgent`] applies
/// once its history grows past `max_messages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryStrategy {
    /// No compaction, ever.
    All,
    /// Drop the oldest middle messages, keep the system message and a
    /// recent tail.
    #[default]
    Window,
    /// Collapse the non-recent middle into one summary message.
    Summarize,
    /// Like `Summarize`, but keeps `tool`-role/metadata-bearing messages
    /// uncompressed and only summarizes the less important half.
    Selective,
}

/// Applies `strategy` to `history`, calling `summarizer` if the strategy
/// needs to condense text. Never fails: a summarizer error degrades to
/// the `Window` policy for this turn (§4.6 "graceful degradation").
pub async fn apply(
    strategy: MemoryStrategy,
    history: &[Message],
    max_messages: usize,
    summarizer: &dyn BlockingModel,
    ctx: &RunContext,
) -> Vec<Message> {
    match strategy {
        MemoryStrategy::All => history.to_vec(),
        MemoryStrategy::Window => window(history, max_messages),
        MemoryStrategy::Summarize => summarize(history, max_messages, summarizer, ctx).await,
        MemoryStrategy::Selective => selective(history, max_messages, summarizer, ctx).await,
    }
}

/// Preserves `history[0]` (the system message, by convention) and the
/// most recent tail, dropping everything in between. Start index for the
/// retained tail is `|H| - N + 1`, clamped to `>= 1` so it never
/// re-includes position 0.
fn window(history: &[Message], max_messages: usize) -> Vec<Message> {
    if history.len() <= max_messages || history.is_empty() {
        return history.to_vec();
    }
    let tail_len = max_messages.saturating_sub(1);
    let start = history.len().saturating_sub(tail_len).max(1);

    let mut result = Vec::with_capacity(1 + (history.len() - start));
    result.push(history[0].clone());
    result.extend_from_slice(&history[start..]);
    result
}

fn render_lines(messages: &[Message]) -> String {
    messages.iter().map(|m| format!("{}\n", m.to_line())).collect()
}

fn summary_prompt(transcript: &str) -> String {
    format!(
        "Summarize the following conversation concisely, preserving any \
         facts or decisions that matter for future turns:\n\n{transcript}"
    )
}

fn summary_message(summary: &str) -> Message {
    Message::system(format!("Previous conversation summary: {summary}"))
}

/// Splits `history` into `(system, middle, recent)` where `recent` is the
/// trailing `max_messages / 2` messages and `middle` is everything
/// between position 1 and the recent boundary. Returns `None` if
/// `history` is within budget (caller should no-op).
fn split_for_summary(history: &[Message], max_messages: usize) -> Option<(&Message, &[Message], &[Message])> {
    if history.len() <= max_messages || history.is_empty() {
        return None;
    }
    let recent_len = max_messages / 2;
    let recent_start = history.len().saturating_sub(recent_len).max(1);
    Some((&history[0], &history[1..recent_start], &history[recent_start..]))
}

async fn summarize(
    history: &[Message],
    max_messages: usize,
    summarizer: &dyn BlockingModel,
    ctx: &RunContext,
) -> Vec<Message> {
    let Some((system, middle, recent)) = split_for_summary(history, max_messages) else {
        return history.to_vec();
    };

    match summarizer.complete(ctx, &summary_prompt(&render_lines(middle))).await {
        Ok(summary) => {
            let mut result = Vec::with_capacity(2 + recent.len());
            result.push(system.clone());
            result.push(summary_message(&summary));
            result.extend_from_slice(recent);
            result
        }
        Err(error) => {
            tracing::warn!(%error, "memory: summarization failed, falling back to window policy");
            window(history, max_messages)
        }
    }
}

fn is_important(message: &Message) -> bool {
    message.role == Role::Tool || !message.metadata.is_empty()
}

async fn selective(
    history: &[Message],
    max_messages: usize,
    summarizer: &dyn BlockingModel,
    ctx: &RunContext,
) -> Vec<Message> {
    let Some((system, middle, recent)) = split_for_summary(history, max_messages) else {
        return history.to_vec();
    };

    let (important, regular): (Vec<Message>, Vec<Message>) =
        middle.iter().cloned().partition(is_important);

    let (summary, tail) = if important.len() + regular.len() > max_messages.saturating_sub(1) {
        let half = regular.len() / 2;
        let (to_summarize, rest) = regular.split_at(half);
        match summarizer
            .complete(ctx, &summary_prompt(&render_lines(to_summarize)))
            .await
        {
            Ok(summary) => {
                let mut tail = rest.to_vec();
                tail.extend_from_slice(recent);
                (Some(summary_message(&summary)), tail)
            }
            Err(error) => {
                tracing::warn!(%error, "memory: selective summarization failed, falling back to window policy");
                return window(history, max_messages);
            }
        }
    } else {
        let mut tail = regular;
        tail.extend_from_slice(recent);
        (None, tail)
    };

    compose_bounded(system, summary, important, tail, max_messages)
}

/// Assembles the final history in priority order: the system message is
/// always kept; the optional summary comes next; `important` messages are
/// kept in full unless they alone exceed what's left of the budget, in
/// which case the oldest are dropped first; whatever budget remains goes
/// to the most recent end of `tail` (the compressible regular-message
/// remainder plus the recent window).
///
/// Pinning `important` like this — rather than running `window` over the
/// whole already-reordered-by-importance array — is what keeps the bound
/// (`result.len() <= max_messages`) from dropping important messages by
/// coincidence of position instead of by an actual budget decision.
fn compose_bounded(
    system: &Message,
    summary: Option<Message>,
    important: Vec<Message>,
    tail: Vec<Message>,
    max_messages: usize,
) -> Vec<Message> {
    let mut budget = max_messages.saturating_sub(1);
    if summary.is_some() {
        budget = budget.saturating_sub(1);
    }

    let important = if important.len() > budget {
        tracing::debug!(
            important_len = important.len(),
            budget,
            "memory: selective important set alone exceeds budget, dropping oldest"
        );
        important[important.len() - budget..].to_vec()
    } else {
        important
    };
    budget -= important.len();

    let tail = if tail.len() > budget {
        tail[tail.len() - budget..].to_vec()
    } else {
        tail
    };

    let mut result = Vec::with_capacity(1 + summary.is_some() as usize + important.len() + tail.len());
    result.push(system.clone());
    if let Some(summary) = summary {
        result.push(summary);
    }
    result.extend(important);
    result.extend(tail);
    result
}
