//! Decoding of provider tool-call payloads into [`ActionDescriptor`]s.
//!
//! Both supported providers share one argument vocabulary (`action`,
//! `coordinate`, `text`, `key`, `direction`, `clicks`, `path`); only the
//! envelope differs. A malformed payload yields `Err` with a reason so the
//! caller can skip that single call with a warning instead of aborting the
//! turn. An unknown `action` value is not malformed: it decodes to
//! [`ActionDescriptor::Other`] and executes as a no-op.

pub mod gemini;
pub mod openai;

use serde_json::Value;

use crate::{ActionDescriptor, Point, ScrollDirection};

/// Name under which the desktop tool is declared to every provider.
pub const TOOL_NAME: &str = "computer_use";

const DEFAULT_SCROLL_CLICKS: u32 = 3;

pub fn action_from_args(args: &Value) -> Result<ActionDescriptor, String> {
    let action = args
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing action field".to_string())?;

    match action {
        "take_screenshot" | "screenshot" => Ok(ActionDescriptor::Screenshot),
        "click" => Ok(ActionDescriptor::Click {
            coordinate: coordinate_field(args)?,
        }),
        "double_click" => Ok(ActionDescriptor::DoubleClick {
            coordinate: coordinate_field(args)?,
        }),
        "right_click" => Ok(ActionDescriptor::RightClick {
            coordinate: coordinate_field(args)?,
        }),
        "move" => Ok(ActionDescriptor::Move {
            coordinate: coordinate_field(args)?,
        }),
        "scroll" => {
            let direction = args
                .get("direction")
                .and_then(Value::as_str)
                .ok_or_else(|| "scroll requires direction".to_string())?;
            let direction = scroll_direction(direction)?;
            let clicks = args
                .get("clicks")
                .and_then(Value::as_f64)
                .map(|c| c.max(0.0).round() as u32)
                .unwrap_or(DEFAULT_SCROLL_CLICKS);
            Ok(ActionDescriptor::Scroll {
                coordinate: args.get("coordinate").map(point_value).transpose()?,
                direction,
                clicks,
            })
        }
        "type" => {
            let text = args
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| "type requires text".to_string())?;
            Ok(ActionDescriptor::Type {
                text: text.to_string(),
            })
        }
        "key" => {
            let key = args
                .get("key")
                .and_then(Value::as_str)
                .ok_or_else(|| "key requires key".to_string())?;
            Ok(ActionDescriptor::Key {
                key: key.to_string(),
            })
        }
        "drag" => {
            let path = args
                .get("path")
                .and_then(Value::as_array)
                .ok_or_else(|| "drag requires path".to_string())?;
            if path.len() < 2 {
                return Err(format!("drag path has {} points, need 2", path.len()));
            }
            Ok(ActionDescriptor::Drag {
                start: point_object(&path[0])?,
                end: point_object(&path[1])?,
            })
        }
        other => Ok(ActionDescriptor::Other {
            name: other.to_string(),
            args: args.clone(),
        }),
    }
}

/// `coordinate: [x, y]`, required for pointer actions.
fn coordinate_field(args: &Value) -> Result<Point, String> {
    let coordinate = args
        .get("coordinate")
        .ok_or_else(|| "missing coordinate field".to_string())?;
    point_value(coordinate)
}

fn point_value(value: &Value) -> Result<Point, String> {
    let pair = value
        .as_array()
        .ok_or_else(|| "coordinate is not an array".to_string())?;
    if pair.len() != 2 {
        return Err(format!("coordinate has {} elements, need 2", pair.len()));
    }
    Ok(Point::new(pixel(&pair[0])?, pixel(&pair[1])?))
}

/// `{ "x": .., "y": .. }` objects, used by drag paths.
fn point_object(value: &Value) -> Result<Point, String> {
    let x = value
        .get("x")
        .ok_or_else(|| "path point missing x".to_string())?;
    let y = value
        .get("y")
        .ok_or_else(|| "path point missing y".to_string())?;
    Ok(Point::new(pixel(x)?, pixel(y)?))
}

fn pixel(value: &Value) -> Result<u32, String> {
    let n = value
        .as_f64()
        .ok_or_else(|| format!("coordinate component is not a number: {value}"))?;
    Ok(n.max(0.0).round() as u32)
}

fn scroll_direction(raw: &str) -> Result<ScrollDirection, String> {
    match raw {
        "up" => Ok(ScrollDirection::Up),
        "down" => Ok(ScrollDirection::Down),
        "left" => Ok(ScrollDirection::Left),
        "right" => Ok(ScrollDirection::Right),
        other => Err(format!("unknown scroll direction: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_pointer_actions() {
        let action = action_from_args(&json!({ "action": "click", "coordinate": [10, 20] }));
        assert_eq!(
            action,
            Ok(ActionDescriptor::Click {
                coordinate: Point::new(10, 20)
            })
        );

        let action =
            action_from_args(&json!({ "action": "double_click", "coordinate": [3.6, 4.4] }));
        assert_eq!(
            action,
            Ok(ActionDescriptor::DoubleClick {
                coordinate: Point::new(4, 4)
            })
        );
    }

    #[test]
    fn missing_coordinate_is_rejected_not_defaulted() {
        let err = action_from_args(&json!({ "action": "click" })).unwrap_err();
        assert!(err.contains("coordinate"), "unexpected reason: {err}");

        let err =
            action_from_args(&json!({ "action": "click", "coordinate": [10] })).unwrap_err();
        assert!(err.contains("elements"), "unexpected reason: {err}");
    }

    #[test]
    fn missing_action_field_is_rejected() {
        assert!(action_from_args(&json!({ "coordinate": [1, 2] })).is_err());
    }

    #[test]
    fn scroll_defaults_to_three_clicks() {
        let action = action_from_args(&json!({ "action": "scroll", "direction": "down" }));
        assert_eq!(
            action,
            Ok(ActionDescriptor::Scroll {
                coordinate: None,
                direction: ScrollDirection::Down,
                clicks: 3,
            })
        );
    }

    #[test]
    fn scroll_with_focus_coordinate() {
        let action = action_from_args(
            &json!({ "action": "scroll", "direction": "up", "clicks": 5, "coordinate": [100, 200] }),
        );
        assert_eq!(
            action,
            Ok(ActionDescriptor::Scroll {
                coordinate: Some(Point::new(100, 200)),
                direction: ScrollDirection::Up,
                clicks: 5,
            })
        );
    }

    #[test]
    fn drag_needs_two_path_points() {
        let action = action_from_args(&json!({
            "action": "drag",
            "path": [{ "x": 1, "y": 2 }, { "x": 3, "y": 4 }],
        }));
        assert_eq!(
            action,
            Ok(ActionDescriptor::Drag {
                start: Point::new(1, 2),
                end: Point::new(3, 4),
            })
        );

        let err = action_from_args(&json!({ "action": "drag", "path": [{ "x": 1, "y": 2 }] }))
            .unwrap_err();
        assert!(err.contains("points"), "unexpected reason: {err}");
    }

    #[test]
    fn unknown_tags_decode_to_other() {
        let args = json!({ "action": "wave_cursor", "speed": "fast" });
        let action = action_from_args(&args).unwrap();
        assert_eq!(
            action,
            ActionDescriptor::Other {
                name: "wave_cursor".to_string(),
                args,
            }
        );
    }
}
