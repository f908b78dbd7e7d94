//! OpenAI function-calling envelope for the desktop tool.

use serde_json::{json, Value};

use super::{action_from_args, TOOL_NAME};
use crate::ActionDescriptor;

/// Tool declaration for the chat-completions `tools` array.
pub fn tool_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Use the computer to perform actions like clicking, typing, taking screenshots, etc.",
            "parameters": parameters_schema(),
        }
    })
}

/// Decode one completed tool call. `arguments` is the JSON-encoded argument
/// string accumulated from streamed fragments.
pub fn decode_tool_call(name: &str, arguments: &str) -> Result<ActionDescriptor, String> {
    if name != TOOL_NAME {
        return Err(format!("unexpected tool name: {name}"));
    }
    let args: Value = serde_json::from_str(arguments)
        .map_err(|err| format!("tool arguments are not valid JSON: {err}"))?;
    action_from_args(&args)
}

fn parameters_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "action": {
                "type": "string",
                "enum": [
                    "take_screenshot", "click", "type", "key", "scroll",
                    "move", "double_click", "right_click", "drag"
                ],
                "description": "The action to perform"
            },
            "coordinate": {
                "type": "array",
                "items": { "type": "number" },
                "description": "X,Y coordinates for actions that require positioning"
            },
            "text": { "type": "string", "description": "Text to type" },
            "key": {
                "type": "string",
                "description": "Key to press (e.g. 'Enter', 'Tab', 'Escape')"
            },
            "direction": {
                "type": "string",
                "enum": ["up", "down", "left", "right"],
                "description": "Direction to scroll"
            },
            "clicks": { "type": "number", "description": "Number of scroll clicks" },
            "path": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "x": { "type": "number" },
                        "y": { "type": "number" }
                    }
                },
                "description": "Path for drag operations with start and end points"
            }
        },
        "required": ["action"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    #[test]
    fn decodes_argument_strings() {
        let action = decode_tool_call(TOOL_NAME, r#"{"action":"click","coordinate":[7,9]}"#);
        assert_eq!(
            action,
            Ok(ActionDescriptor::Click {
                coordinate: Point::new(7, 9)
            })
        );
    }

    #[test]
    fn rejects_unparseable_arguments() {
        let err = decode_tool_call(TOOL_NAME, "{not json").unwrap_err();
        assert!(err.contains("valid JSON"), "unexpected reason: {err}");
    }

    #[test]
    fn rejects_foreign_tool_names() {
        assert!(decode_tool_call("fetch_url", "{}").is_err());
    }

    #[test]
    fn schema_declares_the_full_action_vocabulary() {
        let schema = tool_schema();
        let actions = schema["function"]["parameters"]["properties"]["action"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(actions.len(), 9);
    }
}
