//! Model provider adapters.
//!
//! Each variant turns the session conversation into a provider request and
//! normalizes the response into one incremental [`TurnUnit`] sequence: text
//! deltas, decoded actions, then exactly one completion marker. Whether tool
//! results go back into the open turn or into the working history is a
//! per-adapter capability the loop reads through
//! [`ModelAdapter::submits_tool_results`], keeping the state machine itself
//! provider-agnostic.

pub mod gemini;
pub mod openai;
mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use desk_pilot_error::PilotError;
use desk_pilot_schema::{ActionDescriptor, ActionResult, ChatMessage, ModelProvider, Screenshot};

use crate::config::Config;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

/// Lazily produced output of one model turn.
pub type TurnStream = Pin<Box<dyn Stream<Item = Result<TurnUnit, PilotError>> + Send>>;

#[derive(Debug, Clone, PartialEq)]
pub enum TurnUnit {
    TextDelta(String),
    Action(ActionDescriptor),
    Completed(TurnDisposition),
}

/// How a turn's output sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDisposition {
    /// No further action requested.
    Finished,
    /// The provider stopped to receive a tool result before continuing.
    AwaitingToolResult,
}

#[async_trait]
pub trait ModelAdapter: Send + Sync {
    fn provider(&self) -> ModelProvider;

    /// True when tool results must be submitted back into the open turn;
    /// false when the loop records them in the working history and starts a
    /// fresh turn instead.
    fn submits_tool_results(&self) -> bool;

    /// Opens a model turn over the conversation so far plus the current
    /// frame, attached as the final content item of the outgoing turn.
    async fn begin_turn(
        &mut self,
        history: &[ChatMessage],
        screenshot: &Screenshot,
    ) -> Result<TurnStream, PilotError>;

    /// Continues the open turn with an executed tool result. Only called when
    /// [`Self::submits_tool_results`] is true; `context` is the textual form
    /// fed back to the model.
    async fn submit_tool_result(
        &mut self,
        result: &ActionResult,
        context: &str,
    ) -> Result<TurnStream, PilotError>;
}

/// Builds the adapter for `provider`, failing fast on missing credentials.
pub fn adapter_for(
    provider: ModelProvider,
    config: &Config,
) -> Result<Box<dyn ModelAdapter>, PilotError> {
    let api_key = config.provider_key(provider)?.to_string();
    match provider {
        ModelProvider::OpenAi => Ok(Box::new(OpenAiAdapter::new(
            api_key,
            config.openai_model.clone(),
        ))),
        ModelProvider::Gemini => Ok(Box::new(GeminiAdapter::new(
            api_key,
            config.gemini_model.clone(),
        ))),
    }
}
