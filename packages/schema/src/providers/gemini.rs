//! Gemini function-declaration envelope for the desktop tool.
//!
//! The REST API wants uppercase schema type names and camelCase part keys;
//! argument payloads arrive as already-parsed JSON objects.

use serde_json::{json, Value};

use super::{action_from_args, TOOL_NAME};
use crate::ActionDescriptor;

/// Tool declaration for the `tools[].functionDeclarations` array.
pub fn function_declarations() -> Value {
    json!([
        {
            "name": TOOL_NAME,
            "description": "Use the computer to perform actions like clicking, typing, taking screenshots, etc.",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "action": {
                        "type": "STRING",
                        "enum": [
                            "take_screenshot", "click", "type", "key", "scroll",
                            "move", "double_click", "right_click", "drag"
                        ],
                        "description": "The action to perform"
                    },
                    "coordinate": {
                        "type": "ARRAY",
                        "items": { "type": "NUMBER" },
                        "description": "X,Y coordinates for actions that require positioning"
                    },
                    "text": { "type": "STRING", "description": "Text to type" },
                    "key": {
                        "type": "STRING",
                        "description": "Key to press (e.g. 'Enter', 'Tab', 'Escape')"
                    },
                    "direction": {
                        "type": "STRING",
                        "enum": ["up", "down", "left", "right"],
                        "description": "Direction to scroll"
                    },
                    "clicks": { "type": "NUMBER", "description": "Number of scroll clicks" },
                    "path": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "x": { "type": "NUMBER" },
                                "y": { "type": "NUMBER" }
                            }
                        },
                        "description": "Path for drag operations with start and end points"
                    }
                },
                "required": ["action"]
            }
        }
    ])
}

/// Decode one `functionCall` part.
pub fn decode_function_call(name: &str, args: &Value) -> Result<ActionDescriptor, String> {
    if name != TOOL_NAME {
        return Err(format!("unexpected function name: {name}"));
    }
    action_from_args(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, ScrollDirection};
    use serde_json::json;

    #[test]
    fn decodes_function_call_args() {
        let action = decode_function_call(
            TOOL_NAME,
            &json!({ "action": "scroll", "direction": "down", "clicks": 2, "coordinate": [50, 60] }),
        );
        assert_eq!(
            action,
            Ok(ActionDescriptor::Scroll {
                coordinate: Some(Point::new(50, 60)),
                direction: ScrollDirection::Down,
                clicks: 2,
            })
        );
    }

    #[test]
    fn malformed_args_are_reported_per_call() {
        let err = decode_function_call(TOOL_NAME, &json!({ "action": "type" })).unwrap_err();
        assert!(err.contains("text"), "unexpected reason: {err}");
    }
}
