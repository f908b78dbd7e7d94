//! OpenAI chat-completions adapter.
//!
//! Streams one turn at a time; tool results are not submitted back into the
//! open turn. The loop records them in the working history and the next
//! `begin_turn` replays that history, so this adapter stays stateless.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde_json::{json, Value};

use desk_pilot_error::PilotError;
use desk_pilot_schema::providers::openai as tool;
use desk_pilot_schema::{ActionResult, ChatMessage, ModelProvider, Role, Screenshot};

use super::sse::SseAccumulator;
use super::{ModelAdapter, TurnDisposition, TurnStream, TurnUnit};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PREAMBLE: &str = "\
You are a helpful assistant operating a virtual computer to complete the user's task.

The screenshots you receive show the live desktop of an isolated Ubuntu 22.04 sandbox \
with Firefox, Visual Studio Code, LibreOffice, Python 3, a terminal, and common Linux \
tools preinstalled. Because the machine is an isolated sandbox built for automation, \
you may run commands immediately without asking for confirmation.

Use the computer_use tool to act: take_screenshot, click, double_click, right_click, \
move, scroll, type, key, and drag.

IMPORTANT: after typing a command in the terminal, ALWAYS send a key action with \
'Enter' to run it. Terminal commands do not execute until Enter is pressed.

Analyze the current screenshot before every action and narrate what you are doing so \
the user can follow along.";

const SCREEN_PROMPT: &str =
    "Here is the current screen. Please analyze it and help the user with their task.";

pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: String, model_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model_id,
        }
    }
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    fn provider(&self) -> ModelProvider {
        ModelProvider::OpenAi
    }

    fn submits_tool_results(&self) -> bool {
        false
    }

    async fn begin_turn(
        &mut self,
        history: &[ChatMessage],
        screenshot: &Screenshot,
    ) -> Result<TurnStream, PilotError> {
        let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PREAMBLE })];
        for message in history {
            messages.push(json!({
                "role": role_name(message.role),
                "content": message.content,
            }));
        }
        messages.push(json!({
            "role": "user",
            "content": [
                { "type": "text", "text": SCREEN_PROMPT },
                { "type": "image_url", "image_url": { "url": screenshot.data_url() } },
            ],
        }));

        let body = json!({
            "model": self.model_id,
            "messages": messages,
            "stream": true,
            "tools": [tool::tool_schema()],
            "tool_choice": "auto",
        });

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| PilotError::provider("openai", format!("request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(provider = "openai", %status, detail, "chat completion rejected");
            return Err(PilotError::provider("openai", format!("status {status}")));
        }
        Ok(decode_stream(response))
    }

    async fn submit_tool_result(
        &mut self,
        _result: &ActionResult,
        _context: &str,
    ) -> Result<TurnStream, PilotError> {
        Err(PilotError::provider(
            "openai",
            "adapter does not accept inline tool results",
        ))
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

#[derive(Default)]
struct PartialToolCall {
    name: String,
    arguments: String,
}

struct DecodeState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    acc: SseAccumulator,
    pending: VecDeque<TurnUnit>,
    tool_calls: Vec<PartialToolCall>,
    disposition: TurnDisposition,
    finalized: bool,
    done: bool,
}

impl DecodeState {
    fn ingest(&mut self, payload: &str) {
        if payload == "[DONE]" {
            self.finalize();
            return;
        }
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(provider = "openai", error = %err, "skipping undecodable stream chunk");
                return;
            }
        };
        let Some(choice) = value
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
        else {
            return;
        };

        if let Some(delta) = choice.get("delta") {
            if let Some(text) = delta.get("content").and_then(Value::as_str) {
                if !text.is_empty() {
                    self.pending.push_back(TurnUnit::TextDelta(text.to_string()));
                }
            }
            // Tool-call arguments stream as fragments keyed by call index.
            if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
                for call in calls {
                    let index = call.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
                    if self.tool_calls.len() <= index {
                        self.tool_calls.resize_with(index + 1, PartialToolCall::default);
                    }
                    let slot = &mut self.tool_calls[index];
                    if let Some(function) = call.get("function") {
                        if let Some(name) = function.get("name").and_then(Value::as_str) {
                            slot.name.push_str(name);
                        }
                        if let Some(arguments) = function.get("arguments").and_then(Value::as_str) {
                            slot.arguments.push_str(arguments);
                        }
                    }
                }
            }
        }

        if choice.get("finish_reason").and_then(Value::as_str) == Some("tool_calls") {
            self.disposition = TurnDisposition::AwaitingToolResult;
        }
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        for call in std::mem::take(&mut self.tool_calls) {
            match tool::decode_tool_call(&call.name, &call.arguments) {
                Ok(action) => self.pending.push_back(TurnUnit::Action(action)),
                Err(reason) => {
                    tracing::warn!(
                        provider = "openai",
                        tool = %call.name,
                        %reason,
                        "skipping malformed tool call"
                    );
                }
            }
        }
        self.pending.push_back(TurnUnit::Completed(self.disposition));
    }
}

fn decode_stream(response: reqwest::Response) -> TurnStream {
    let state = DecodeState {
        bytes: response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed(),
        acc: SseAccumulator::new(),
        pending: VecDeque::new(),
        tool_calls: Vec::new(),
        disposition: TurnDisposition::Finished,
        finalized: false,
        done: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(unit) = state.pending.pop_front() {
                return Some((Ok(unit), state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let text = String::from_utf8_lossy(&chunk).into_owned();
                    for payload in state.acc.push(&text) {
                        state.ingest(&payload);
                    }
                }
                Some(Err(err)) => {
                    state.done = true;
                    return Some((
                        Err(PilotError::provider(
                            "openai",
                            format!("stream failed: {err}"),
                        )),
                        state,
                    ));
                }
                None => {
                    if let Some(payload) = state.acc.finish() {
                        state.ingest(&payload);
                    }
                    state.finalize();
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}
