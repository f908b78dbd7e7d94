//! Executes decoded action descriptors against a desktop surface.
//!
//! Descriptors arrive in model space; pointer coordinates are converted to
//! the sandbox's native resolution before dispatch. Transport faults never
//! escape as errors: they come back as failed [`ActionResult`]s so one bad
//! sandbox call cannot take the whole loop down.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use desk_pilot_error::PilotError;
use desk_pilot_schema::{ActionDescriptor, ActionPayload, ActionResult, Screenshot};

use crate::resolution::ResolutionScaler;
use crate::surface::DesktopSurface;

pub struct ActionExecutor {
    surface: Arc<dyn DesktopSurface>,
    scaler: ResolutionScaler,
}

impl ActionExecutor {
    pub fn new(surface: Arc<dyn DesktopSurface>, scaler: ResolutionScaler) -> Self {
        Self { surface, scaler }
    }

    pub fn scaler(&self) -> &ResolutionScaler {
        &self.scaler
    }

    /// Captures the framebuffer for model context. Unlike action dispatch
    /// this propagates the fault: a turn cannot start without a frame.
    pub async fn capture_screenshot(&self) -> Result<Screenshot, PilotError> {
        let bytes = self.surface.screenshot().await?;
        Ok(Screenshot::png(BASE64.encode(bytes)))
    }

    pub async fn execute(&self, action: &ActionDescriptor) -> ActionResult {
        match self.dispatch(action).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(action = action.tag(), error = %err, "desktop action failed");
                ActionResult::failure(err.to_string())
            }
        }
    }

    async fn dispatch(&self, action: &ActionDescriptor) -> Result<ActionResult, PilotError> {
        match action {
            ActionDescriptor::Screenshot => {
                let shot = self.capture_screenshot().await?;
                Ok(ActionResult::with_payload(ActionPayload::Screenshot {
                    mime_type: shot.mime_type,
                    data: shot.data,
                }))
            }
            ActionDescriptor::Click { coordinate } => {
                let p = self.scaler.to_original_space(*coordinate);
                self.surface.left_click(p.x, p.y).await?;
                Ok(ActionResult::ok())
            }
            ActionDescriptor::DoubleClick { coordinate } => {
                let p = self.scaler.to_original_space(*coordinate);
                self.surface.double_click(p.x, p.y).await?;
                Ok(ActionResult::ok())
            }
            ActionDescriptor::RightClick { coordinate } => {
                let p = self.scaler.to_original_space(*coordinate);
                self.surface.right_click(p.x, p.y).await?;
                Ok(ActionResult::ok())
            }
            ActionDescriptor::Move { coordinate } => {
                let p = self.scaler.to_original_space(*coordinate);
                self.surface.move_mouse(p.x, p.y).await?;
                Ok(ActionResult::ok())
            }
            ActionDescriptor::Scroll {
                coordinate,
                direction,
                clicks,
            } => {
                // Focus the scroll target first when the model named one.
                if let Some(coordinate) = coordinate {
                    let p = self.scaler.to_original_space(*coordinate);
                    self.surface.move_mouse(p.x, p.y).await?;
                }
                self.surface.scroll(*direction, *clicks).await?;
                Ok(ActionResult::ok())
            }
            ActionDescriptor::Type { text } => {
                self.surface.write(text).await?;
                Ok(ActionResult::ok())
            }
            ActionDescriptor::Key { key } => {
                self.surface.press(key).await?;
                Ok(ActionResult::ok())
            }
            ActionDescriptor::Drag { start, end } => {
                let from = self.scaler.to_original_space(*start);
                let to = self.scaler.to_original_space(*end);
                self.surface.drag((from.x, from.y), (to.x, to.y)).await?;
                Ok(ActionResult::ok())
            }
            ActionDescriptor::Other { name, .. } => {
                tracing::warn!(action = %name, "unknown action type, ignoring");
                Ok(ActionResult::ok())
            }
        }
    }
}
