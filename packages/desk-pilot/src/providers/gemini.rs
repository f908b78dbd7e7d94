//! Gemini streaming adapter.
//!
//! Gemini continues a turn only after receiving an explicit function
//! response, so this adapter owns the turn transcript: streamed model parts
//! are recorded as they decode, and tool results come back through
//! `submit_tool_result` as `functionResponse` parts extending the same
//! contents.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde_json::{json, Value};

use desk_pilot_error::PilotError;
use desk_pilot_schema::providers::gemini as tool;
use desk_pilot_schema::providers::TOOL_NAME;
use desk_pilot_schema::{ActionResult, ChatMessage, ModelProvider, Role, Screenshot};

use super::sse::SseAccumulator;
use super::{ModelAdapter, TurnDisposition, TurnStream, TurnUnit};

const GENERATE_URL_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SYSTEM_PREAMBLE: &str = "\
You are a helpful assistant that can use a computer to support the user with their \
tasks: browsing the web, writing code, editing files, and more.

The screenshots you receive come from a running sandbox instance, an isolated \
Ubuntu 22.04 virtual machine built for AI use. It has Firefox, Visual Studio Code, \
LibreOffice, Python 3 with common libraries, a terminal with standard Linux \
utilities, a file manager, and a text editor preinstalled. Because the machine is \
fully isolated, you can run commands and operations without confirmation whenever \
they serve the user's task.

You have access to the computer_use tool with these actions: take_screenshot, \
click, double_click, right_click, move, scroll, type, key, and drag.

IMPORTANT: when typing a command in the terminal, ALWAYS send the key action with \
'Enter' immediately after typing it. Terminal commands do not run until Enter is \
pressed.

IMPORTANT: prefer Visual Studio Code for editing files; it gives you syntax \
highlighting and a better editing environment.

Keep the user informed: send short comments about what you are doing and what \
comes next, and check the screen state regularly. Always analyze the screenshot \
first, then take the most suitable action toward the user's goal.";

const SCREEN_PROMPT: &str =
    "Here is the current screen. Please analyze it and help the user with their task.";

pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
    contents: Arc<Mutex<Vec<Value>>>,
    seeded: bool,
}

impl GeminiAdapter {
    pub fn new(api_key: String, model_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model_id,
            contents: Arc::new(Mutex::new(Vec::new())),
            seeded: false,
        }
    }

    async fn open_stream(&self) -> Result<TurnStream, PilotError> {
        let contents = lock_transcript(&self.contents).clone();
        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PREAMBLE }] },
            "contents": contents,
            "tools": [{ "functionDeclarations": tool::function_declarations() }],
        });
        let url = format!(
            "{GENERATE_URL_BASE}/{}:streamGenerateContent?alt=sse",
            self.model_id
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| PilotError::provider("gemini", format!("request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(provider = "gemini", %status, detail, "generate content rejected");
            return Err(PilotError::provider("gemini", format!("status {status}")));
        }
        Ok(decode_stream(response, self.contents.clone()))
    }
}

#[async_trait]
impl ModelAdapter for GeminiAdapter {
    fn provider(&self) -> ModelProvider {
        ModelProvider::Gemini
    }

    fn submits_tool_results(&self) -> bool {
        true
    }

    async fn begin_turn(
        &mut self,
        history: &[ChatMessage],
        screenshot: &Screenshot,
    ) -> Result<TurnStream, PilotError> {
        {
            let mut contents = lock_transcript(&self.contents);
            if !self.seeded {
                for message in history {
                    let role = if message.role == Role::Assistant {
                        "model"
                    } else {
                        "user"
                    };
                    contents.push(json!({
                        "role": role,
                        "parts": [{ "text": message.content }],
                    }));
                }
            }
            contents.push(json!({
                "role": "user",
                "parts": [
                    { "text": SCREEN_PROMPT },
                    { "inlineData": { "mimeType": screenshot.mime_type, "data": screenshot.data } },
                ],
            }));
        }
        self.seeded = true;
        self.open_stream().await
    }

    async fn submit_tool_result(
        &mut self,
        _result: &ActionResult,
        context: &str,
    ) -> Result<TurnStream, PilotError> {
        lock_transcript(&self.contents).push(json!({
            "role": "user",
            "parts": [{
                "functionResponse": {
                    "name": TOOL_NAME,
                    "response": { "result": context },
                }
            }],
        }));
        self.open_stream().await
    }
}

fn lock_transcript(contents: &Arc<Mutex<Vec<Value>>>) -> MutexGuard<'_, Vec<Value>> {
    contents.lock().unwrap_or_else(PoisonError::into_inner)
}

struct DecodeState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    acc: SseAccumulator,
    pending: VecDeque<TurnUnit>,
    transcript: Arc<Mutex<Vec<Value>>>,
    /// Transcript index of this stream's model content, created on the first
    /// decoded part so function responses land after it.
    entry_index: Option<usize>,
    saw_action: bool,
    error: Option<String>,
    finalized: bool,
    done: bool,
}

impl DecodeState {
    fn ingest(&mut self, payload: &str) {
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(provider = "gemini", error = %err, "skipping undecodable stream chunk");
                return;
            }
        };
        if let Some(message) = value.pointer("/error/message").and_then(Value::as_str) {
            self.error = Some(message.to_string());
            return;
        }
        let Some(parts) = value
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
        else {
            return;
        };

        for part in parts {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    self.pending.push_back(TurnUnit::TextDelta(text.to_string()));
                    self.record_part(json!({ "text": text }));
                }
            }
            if let Some(call) = part.get("functionCall") {
                let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
                let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
                match tool::decode_function_call(name, &args) {
                    Ok(action) => {
                        self.saw_action = true;
                        // Only calls that will be answered go on the
                        // transcript; a skipped call must not leave an
                        // unanswered functionCall behind.
                        self.record_part(json!({ "functionCall": { "name": name, "args": args } }));
                        self.pending.push_back(TurnUnit::Action(action));
                    }
                    Err(reason) => {
                        tracing::warn!(
                            provider = "gemini",
                            function = %name,
                            %reason,
                            "skipping malformed tool call"
                        );
                    }
                }
            }
        }
    }

    fn record_part(&mut self, part: Value) {
        let mut transcript = lock_transcript(&self.transcript);
        match self.entry_index {
            Some(index) => {
                if let Some(parts) = transcript
                    .get_mut(index)
                    .and_then(|content| content.get_mut("parts"))
                    .and_then(Value::as_array_mut)
                {
                    parts.push(part);
                }
            }
            None => {
                transcript.push(json!({ "role": "model", "parts": [part] }));
                self.entry_index = Some(transcript.len() - 1);
            }
        }
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        let disposition = if self.saw_action {
            TurnDisposition::AwaitingToolResult
        } else {
            TurnDisposition::Finished
        };
        self.pending.push_back(TurnUnit::Completed(disposition));
    }
}

fn decode_stream(response: reqwest::Response, transcript: Arc<Mutex<Vec<Value>>>) -> TurnStream {
    let state = DecodeState {
        bytes: response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed(),
        acc: SseAccumulator::new(),
        pending: VecDeque::new(),
        transcript,
        entry_index: None,
        saw_action: false,
        error: None,
        finalized: false,
        done: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(unit) = state.pending.pop_front() {
                return Some((Ok(unit), state));
            }
            if let Some(message) = state.error.take() {
                state.done = true;
                return Some((Err(PilotError::provider("gemini", message)), state));
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
                            "gemini",
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
