//! The conversation loop: one strictly sequential task per session.
//!
//! A session is a spawned task that alternates model turns and desktop
//! actions, pushing [`StreamEvent`]s into an mpsc channel that the SSE
//! transport drains. Nothing in a session runs concurrently with anything
//! else in the same session: each turn's screenshot and history depend on the
//! completed effects of the previous action.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use desk_pilot_desktop::{ActionExecutor, SandboxHandle};
use desk_pilot_schema::{ChatMessage, StreamEvent};

use crate::providers::{ModelAdapter, TurnDisposition, TurnUnit};

pub const CANCELLED_MESSAGE: &str = "Generation stopped by user";

/// Cooperative cancellation flag shared between the transport and the loop.
/// Checked before each model turn and after each consumed output unit; there
/// is no preemptive interruption of in-flight calls.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How one turn resolved, driving the outer session state machine.
enum TurnFlow {
    /// The turn dispatched actions; begin another one.
    Continue,
    /// No further action requested; terminate with the accumulated text.
    Done(Option<String>),
    Cancelled,
    Failed(String),
}

pub struct SessionLoop {
    adapter: Box<dyn ModelAdapter>,
    executor: ActionExecutor,
    history: Vec<ChatMessage>,
    created: Option<SandboxHandle>,
    cancel: CancelFlag,
    events: mpsc::Sender<StreamEvent>,
}

impl SessionLoop {
    pub fn new(
        adapter: Box<dyn ModelAdapter>,
        executor: ActionExecutor,
        history: Vec<ChatMessage>,
        created: Option<SandboxHandle>,
        cancel: CancelFlag,
        events: mpsc::Sender<StreamEvent>,
    ) -> Self {
        Self {
            adapter,
            executor,
            history,
            created,
            cancel,
            events,
        }
    }

    /// Drives the session until a terminal event has been emitted.
    pub async fn run(mut self) {
        if let Some(sandbox) = self.created.take() {
            // Freshly provisioned sandboxes announce themselves before any
            // model turn so the client can attach its viewer.
            let announced = self
                .emit(StreamEvent::SandboxCreated {
                    sandbox_id: sandbox.sandbox_id,
                    vnc_url: sandbox.vnc_url,
                })
                .await;
            if !announced {
                return;
            }
        }

        loop {
            if self.cancel.is_cancelled() {
                self.emit_cancelled().await;
                return;
            }
            match self.run_turn().await {
                TurnFlow::Continue => {}
                TurnFlow::Done(content) => {
                    self.emit(StreamEvent::Done { content }).await;
                    return;
                }
                TurnFlow::Cancelled => {
                    self.emit_cancelled().await;
                    return;
                }
                TurnFlow::Failed(content) => {
                    self.emit(StreamEvent::Error { content }).await;
                    return;
                }
            }
        }
    }

    async fn run_turn(&mut self) -> TurnFlow {
        let provider = self.adapter.provider();

        let screenshot = match self.executor.capture_screenshot().await {
            Ok(screenshot) => screenshot,
            Err(err) => {
                tracing::error!(provider = provider.as_str(), error = %err, "turn screenshot failed");
                return TurnFlow::Failed(err.client_message());
            }
        };

        let first = match self.adapter.begin_turn(&self.history, &screenshot).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(provider = provider.as_str(), error = %err, "model turn failed");
                return TurnFlow::Failed(err.client_message());
            }
        };

        // Inline tool-result continuations queue behind the stream that is
        // currently draining, which keeps unit ordering deterministic.
        let mut streams = VecDeque::new();
        streams.push_back(first);

        let mut turn_text = String::new();
        let mut actions_dispatched = 0usize;
        let mut disposition = TurnDisposition::Finished;

        while let Some(mut stream) = streams.pop_front() {
            while let Some(unit) = stream.next().await {
                if self.cancel.is_cancelled() {
                    return TurnFlow::Cancelled;
                }
                let unit = match unit {
                    Ok(unit) => unit,
                    Err(err) => {
                        tracing::error!(provider = provider.as_str(), error = %err, "provider stream failed");
                        return TurnFlow::Failed(err.client_message());
                    }
                };
                match unit {
                    TurnUnit::TextDelta(delta) => {
                        turn_text.push_str(&delta);
                        if !self.emit(StreamEvent::Update { content: delta }).await {
                            return TurnFlow::Cancelled;
                        }
                    }
                    TurnUnit::Action(action) => {
                        if !self
                            .emit(StreamEvent::Action {
                                action: action.clone(),
                            })
                            .await
                        {
                            return TurnFlow::Cancelled;
                        }
                        let result = self.executor.execute(&action).await;
                        if !self.emit(StreamEvent::ActionCompleted).await {
                            return TurnFlow::Cancelled;
                        }
                        actions_dispatched += 1;

                        let context = result.describe(&action);
                        if self.adapter.submits_tool_results() {
                            match self.adapter.submit_tool_result(&result, &context).await {
                                Ok(continuation) => streams.push_back(continuation),
                                Err(err) => {
                                    tracing::error!(
                                        provider = provider.as_str(),
                                        action = action.tag(),
                                        error = %err,
                                        "tool result submission failed"
                                    );
                                    return TurnFlow::Failed(err.client_message());
                                }
                            }
                        } else {
                            let record = serde_json::to_string(&action)
                                .unwrap_or_else(|_| action.tag().to_string());
                            self.history
                                .push(ChatMessage::assistant(format!("Executed action: {record}")));
                            self.history.push(ChatMessage::user(context));
                        }
                    }
                    TurnUnit::Completed(d) => disposition = d,
                }
            }
        }

        if !turn_text.is_empty() {
            self.history.push(ChatMessage::assistant(turn_text.clone()));
        }

        if actions_dispatched == 0 && disposition == TurnDisposition::Finished {
            TurnFlow::Done((!turn_text.is_empty()).then_some(turn_text))
        } else {
            TurnFlow::Continue
        }
    }

    async fn emit_cancelled(&self) {
        tracing::info!("session cancelled");
        self.emit(StreamEvent::Done {
            content: Some(CANCELLED_MESSAGE.to_string()),
        })
        .await;
    }

    /// False means the client is gone; the cancellation flag is tripped so
    /// the caller stops without emitting anything further.
    async fn emit(&self, event: StreamEvent) -> bool {
        if self.events.send(event).await.is_err() {
            self.cancel.cancel();
            return false;
        }
        true
    }
}
