//! Provider-agnostic data model for the desktop interaction loop.
//!
//! Everything here is plain data: conversation messages, decoded desktop
//! actions, action outcomes, and the event records republished to clients.
//! Decoding of provider-native tool-call payloads lives in [`providers`].

pub mod providers;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Model provider backing a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[default]
    Gemini,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "openai",
            ModelProvider::Gemini => "gemini",
        }
    }
}

/// A pixel position. Whether it is in model space or sandbox-native space
/// depends on where it sits in the pipeline; descriptors carry model space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
            ScrollDirection::Left => "left",
            ScrollDirection::Right => "right",
        }
    }
}

/// One desktop action requested by the model. Coordinates are in model space;
/// the executor converts to sandbox-native space before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionDescriptor {
    Screenshot,
    Click {
        coordinate: Point,
    },
    DoubleClick {
        coordinate: Point,
    },
    RightClick {
        coordinate: Point,
    },
    Move {
        coordinate: Point,
    },
    Scroll {
        #[serde(skip_serializing_if = "Option::is_none")]
        coordinate: Option<Point>,
        direction: ScrollDirection,
        clicks: u32,
    },
    Type {
        text: String,
    },
    Key {
        key: String,
    },
    Drag {
        start: Point,
        end: Point,
    },
    /// Catch-all for tags this build does not know. Executed as a no-op so a
    /// forward-compatible provider cannot crash the loop.
    Other {
        name: String,
        args: serde_json::Value,
    },
}

impl ActionDescriptor {
    /// Tag used in logs and in the textual feedback returned to the model.
    pub fn tag(&self) -> &str {
        match self {
            ActionDescriptor::Screenshot => "screenshot",
            ActionDescriptor::Click { .. } => "click",
            ActionDescriptor::DoubleClick { .. } => "double_click",
            ActionDescriptor::RightClick { .. } => "right_click",
            ActionDescriptor::Move { .. } => "move",
            ActionDescriptor::Scroll { .. } => "scroll",
            ActionDescriptor::Type { .. } => "type",
            ActionDescriptor::Key { .. } => "key",
            ActionDescriptor::Drag { .. } => "drag",
            ActionDescriptor::Other { name, .. } => name,
        }
    }
}

/// Outcome of one executed action. Failures are data, never errors: the loop
/// decides how to surface them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ActionPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            payload: None,
            error: None,
        }
    }

    pub fn with_payload(payload: ActionPayload) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }

    /// Textual context fed back to the model after executing `action`.
    pub fn describe(&self, action: &ActionDescriptor) -> String {
        if !self.success {
            let reason = self.error.as_deref().unwrap_or("unknown error");
            return format!("Action {} failed: {}", action.tag(), reason);
        }
        match self.payload {
            Some(ActionPayload::Screenshot { .. }) => "Screenshot taken".to_string(),
            None => format!("Action {} completed", action.tag()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Base64-encoded capture of the sandbox framebuffer.
    Screenshot { mime_type: String, data: String },
}

/// A captured frame as attached to outgoing model turns.
#[derive(Debug, Clone, PartialEq)]
pub struct Screenshot {
    pub mime_type: String,
    pub data: String,
}

impl Screenshot {
    pub fn png(data: String) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            data,
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One record of the outbound session stream. Ordering within a turn is
/// significant; the stream is terminated by exactly one of `done` | `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    SandboxCreated {
        sandbox_id: String,
        vnc_url: String,
    },
    Update {
        content: String,
    },
    Action {
        action: ActionDescriptor,
    },
    ActionCompleted,
    Error {
        content: String,
    },
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stream_events_serialize_with_type_tag() {
        let event = StreamEvent::SandboxCreated {
            sandbox_id: "sb_1".to_string(),
            vnc_url: "https://vnc.example/sb_1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "sandbox_created",
                "sandbox_id": "sb_1",
                "vnc_url": "https://vnc.example/sb_1",
            })
        );

        let event = StreamEvent::ActionCompleted;
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "type": "action_completed" })
        );

        let event = StreamEvent::Done { content: None };
        assert_eq!(serde_json::to_value(&event).unwrap(), json!({ "type": "done" }));
    }

    #[test]
    fn action_events_carry_model_space_descriptors() {
        let event = StreamEvent::Action {
            action: ActionDescriptor::Click {
                coordinate: Point::new(512, 384),
            },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "action",
                "action": { "action": "click", "coordinate": { "x": 512, "y": 384 } },
            })
        );
    }

    #[test]
    fn action_feedback_mentions_tag_and_failure() {
        let click = ActionDescriptor::Click {
            coordinate: Point::new(1, 2),
        };
        assert_eq!(ActionResult::ok().describe(&click), "Action click completed");
        assert_eq!(
            ActionResult::failure("connection reset").describe(&click),
            "Action click failed: connection reset"
        );

        let shot = ActionResult::with_payload(ActionPayload::Screenshot {
            mime_type: "image/png".to_string(),
            data: "aGk=".to_string(),
        });
        assert_eq!(
            shot.describe(&ActionDescriptor::Screenshot),
            "Screenshot taken"
        );
    }

    #[test]
    fn screenshot_data_url_shape() {
        let shot = Screenshot::png("aGk=".to_string());
        assert_eq!(shot.data_url(), "data:image/png;base64,aGk=");
    }
}
