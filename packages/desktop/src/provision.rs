//! Sandbox lifecycle client: create a fresh desktop or attach to a running
//! one. Lifetime management (idle timeout, teardown) stays with the gateway.

use serde::Deserialize;
use serde_json::json;

use desk_pilot_error::PilotError;

use crate::surface::HttpDesktop;

/// Idle timeout requested for every session, renewed once per request.
pub const SANDBOX_TIMEOUT_MS: u64 = 300_000;

const SANDBOX_DPI: u32 = 96;

/// Identity of a freshly provisioned sandbox, surfaced to the client through
/// the first stream event.
#[derive(Debug, Clone)]
pub struct SandboxHandle {
    pub sandbox_id: String,
    pub vnc_url: String,
}

#[derive(Debug, Deserialize)]
struct SandboxResponse {
    sandbox_id: String,
    vnc_url: String,
}

#[derive(Debug, Clone)]
pub struct SandboxProvisioner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SandboxProvisioner {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Provision a new desktop at `resolution` with its viewer stream started.
    pub async fn create(
        &self,
        resolution: (u32, u32),
    ) -> Result<(SandboxHandle, HttpDesktop), PilotError> {
        let url = format!("{}/sandboxes", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "resolution": [resolution.0, resolution.1],
                "dpi": SANDBOX_DPI,
                "timeout_ms": SANDBOX_TIMEOUT_MS,
            }))
            .send()
            .await
            .map_err(|err| PilotError::sandbox(format!("create request failed: {err}")))?;
        let sandbox = decode_sandbox(response).await?;
        tracing::info!(sandbox_id = %sandbox.sandbox_id, "sandbox created");
        Ok(self.into_pair(sandbox))
    }

    /// Attach to an existing sandbox by id.
    pub async fn connect(
        &self,
        sandbox_id: &str,
    ) -> Result<(SandboxHandle, HttpDesktop), PilotError> {
        let url = format!(
            "{}/sandboxes/{}",
            self.base_url.trim_end_matches('/'),
            sandbox_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| PilotError::sandbox(format!("connect request failed: {err}")))?;
        let sandbox = decode_sandbox(response).await?;
        Ok(self.into_pair(sandbox))
    }

    fn into_pair(&self, sandbox: SandboxResponse) -> (SandboxHandle, HttpDesktop) {
        let desktop = HttpDesktop::new(
            self.client.clone(),
            self.base_url.clone(),
            self.api_key.clone(),
            sandbox.sandbox_id.clone(),
        );
        (
            SandboxHandle {
                sandbox_id: sandbox.sandbox_id,
                vnc_url: sandbox.vnc_url,
            },
            desktop,
        )
    }
}

async fn decode_sandbox(response: reqwest::Response) -> Result<SandboxResponse, PilotError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(PilotError::sandbox(format!(
            "desktop gateway returned {status}: {detail}"
        )));
    }
    response
        .json::<SandboxResponse>()
        .await
        .map_err(|err| PilotError::sandbox(format!("malformed sandbox response: {err}")))
}
