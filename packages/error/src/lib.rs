//! Error taxonomy shared across the desk-pilot crates.
//!
//! Faults that reach a client before the event stream opens are rendered as
//! RFC 7807 problem-details bodies; faults inside an open stream are the
//! concern of the conversation loop and never surface through this crate.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Broad fault classification, used as the problem-details `type` and as a
/// structured field in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Config,
    Sandbox,
    Provider,
    Stream,
    InvalidRequest,
}

impl ErrorType {
    pub fn title(&self) -> &'static str {
        match self {
            ErrorType::Config => "Configuration error",
            ErrorType::Sandbox => "Sandbox unavailable",
            ErrorType::Provider => "Model provider error",
            ErrorType::Stream => "Stream error",
            ErrorType::InvalidRequest => "Invalid request",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ErrorType::Config => 500,
            ErrorType::Sandbox => 502,
            ErrorType::Provider => 502,
            ErrorType::Stream => 500,
            ErrorType::InvalidRequest => 400,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PilotError {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("sandbox error: {message}")]
    Sandbox { message: String },

    #[error("provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("stream error: {message}")]
    Stream { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl PilotError {
    pub fn config(message: impl Into<String>) -> Self {
        PilotError::Config {
            message: message.into(),
        }
    }

    pub fn sandbox(message: impl Into<String>) -> Self {
        PilotError::Sandbox {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        PilotError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        PilotError::Stream {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        PilotError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            PilotError::Config { .. } => ErrorType::Config,
            PilotError::Sandbox { .. } => ErrorType::Sandbox,
            PilotError::Provider { .. } => ErrorType::Provider,
            PilotError::Stream { .. } => ErrorType::Stream,
            PilotError::InvalidRequest { .. } => ErrorType::InvalidRequest,
        }
    }

    /// Message safe to show a client. Provider and transport internals stay
    /// in the logs; configuration and request problems are literal.
    pub fn client_message(&self) -> String {
        match self {
            PilotError::Config { message } => message.clone(),
            PilotError::InvalidRequest { message } => message.clone(),
            PilotError::Sandbox { .. } => "Failed to connect to sandbox".to_string(),
            PilotError::Provider { .. } | PilotError::Stream { .. } => {
                "An error occurred with the AI service. Please try again.".to_string()
            }
        }
    }

    pub fn to_problem_details(&self) -> ProblemDetails {
        let error_type = self.error_type();
        ProblemDetails {
            error_type,
            title: error_type.title().to_string(),
            status: error_type.status(),
            detail: Some(self.client_message()),
        }
    }
}

/// RFC 7807 style error body returned on non-stream failures.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ToSchema)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_details_are_sanitized_for_clients() {
        let err = PilotError::provider("gemini", "401 unauthorized: key=abc123");
        let problem = err.to_problem_details();
        assert_eq!(problem.status, 502);
        let detail = problem.detail.unwrap();
        assert!(!detail.contains("abc123"), "leaked internals: {detail}");
    }

    #[test]
    fn config_details_stay_literal() {
        let err = PilotError::config("GEMINI_API_KEY is not set");
        let problem = err.to_problem_details();
        assert_eq!(problem.status, 500);
        assert_eq!(problem.detail.as_deref(), Some("GEMINI_API_KEY is not set"));
    }

    #[test]
    fn problem_details_wire_shape() {
        let problem = PilotError::invalid_request("unknown model").to_problem_details();
        let json = serde_json::to_string(&problem).unwrap();
        assert!(json.contains("\"type\":\"invalid_request\""));
        assert!(json.contains("\"status\":400"));
    }
}
