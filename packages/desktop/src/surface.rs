//! The remote desktop capability interface and its HTTP implementation.
//!
//! Every coordinate crossing this boundary is in the sandbox's native
//! resolution; scaling is the executor's job.

use async_trait::async_trait;
use serde_json::{json, Value};

use desk_pilot_error::PilotError;
use desk_pilot_schema::ScrollDirection;

/// Capability surface of one remote desktop sandbox.
#[async_trait]
pub trait DesktopSurface: Send + Sync {
    async fn screenshot(&self) -> Result<Vec<u8>, PilotError>;
    async fn left_click(&self, x: u32, y: u32) -> Result<(), PilotError>;
    async fn double_click(&self, x: u32, y: u32) -> Result<(), PilotError>;
    async fn right_click(&self, x: u32, y: u32) -> Result<(), PilotError>;
    async fn move_mouse(&self, x: u32, y: u32) -> Result<(), PilotError>;
    async fn write(&self, text: &str) -> Result<(), PilotError>;
    async fn press(&self, key: &str) -> Result<(), PilotError>;
    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), PilotError>;
    async fn drag(&self, from: (u32, u32), to: (u32, u32)) -> Result<(), PilotError>;
    /// Renews the sandbox idle timeout; expiry itself is the provisioning
    /// service's concern.
    async fn set_timeout(&self, timeout_ms: u64) -> Result<(), PilotError>;
}

/// Desktop gateway client for one sandbox.
#[derive(Debug, Clone)]
pub struct HttpDesktop {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sandbox_id: String,
}

impl HttpDesktop {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        sandbox_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            sandbox_id: sandbox_id.into(),
        }
    }

    pub fn sandbox_id(&self) -> &str {
        &self.sandbox_id
    }

    async fn post_action(&self, body: Value) -> Result<(), PilotError> {
        let url = format!(
            "{}/sandboxes/{}/actions",
            self.base_url.trim_end_matches('/'),
            self.sandbox_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| PilotError::sandbox(format!("action request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PilotError::sandbox(format!(
                "desktop gateway returned {status}: {detail}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DesktopSurface for HttpDesktop {
    async fn screenshot(&self) -> Result<Vec<u8>, PilotError> {
        let url = format!(
            "{}/sandboxes/{}/screenshot",
            self.base_url.trim_end_matches('/'),
            self.sandbox_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| PilotError::sandbox(format!("screenshot request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PilotError::sandbox(format!(
                "screenshot returned {status}"
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| PilotError::sandbox(format!("screenshot body failed: {err}")))?;
        Ok(bytes.to_vec())
    }

    async fn left_click(&self, x: u32, y: u32) -> Result<(), PilotError> {
        self.post_action(json!({ "action": "left_click", "x": x, "y": y }))
            .await
    }

    async fn double_click(&self, x: u32, y: u32) -> Result<(), PilotError> {
        self.post_action(json!({ "action": "double_click", "x": x, "y": y }))
            .await
    }

    async fn right_click(&self, x: u32, y: u32) -> Result<(), PilotError> {
        self.post_action(json!({ "action": "right_click", "x": x, "y": y }))
            .await
    }

    async fn move_mouse(&self, x: u32, y: u32) -> Result<(), PilotError> {
        self.post_action(json!({ "action": "move_mouse", "x": x, "y": y }))
            .await
    }

    async fn write(&self, text: &str) -> Result<(), PilotError> {
        self.post_action(json!({ "action": "write", "text": text }))
            .await
    }

    async fn press(&self, key: &str) -> Result<(), PilotError> {
        self.post_action(json!({ "action": "press", "key": key }))
            .await
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), PilotError> {
        self.post_action(json!({
            "action": "scroll",
            "direction": direction.as_str(),
            "amount": amount,
        }))
        .await
    }

    async fn drag(&self, from: (u32, u32), to: (u32, u32)) -> Result<(), PilotError> {
        self.post_action(json!({
            "action": "drag",
            "from": { "x": from.0, "y": from.1 },
            "to": { "x": to.0, "y": to.1 },
        }))
        .await
    }

    async fn set_timeout(&self, timeout_ms: u64) -> Result<(), PilotError> {
        self.post_action(json!({ "action": "set_timeout", "timeout_ms": timeout_ms }))
            .await
    }
}
