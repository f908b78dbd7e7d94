//! Environment-backed runtime configuration.
//!
//! Credentials are looked up lazily per request so that a missing key fails
//! that request fast with a problem-details response instead of preventing
//! the service from starting at all.

use desk_pilot_error::PilotError;
use desk_pilot_schema::ModelProvider;

/// Resolution used when the client does not send one. Within the scaling
/// bounds, so the model sees it unchanged.
pub const DEFAULT_RESOLUTION: (u32, u32) = (1024, 720);

const DEFAULT_DESKTOP_API_URL: &str = "http://127.0.0.1:8200";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub desktop_api_url: String,
    pub desktop_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_model: String,
    pub gemini_model: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            desktop_api_url: env_or("DESKTOP_API_URL", DEFAULT_DESKTOP_API_URL),
            desktop_api_key: non_empty_env("DESKTOP_API_KEY"),
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            gemini_api_key: non_empty_env("GEMINI_API_KEY"),
            openai_model: env_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        }
    }

    pub fn desktop_api_key(&self) -> Result<&str, PilotError> {
        self.desktop_api_key
            .as_deref()
            .ok_or_else(|| PilotError::config("DESKTOP_API_KEY is not set"))
    }

    pub fn provider_key(&self, provider: ModelProvider) -> Result<&str, PilotError> {
        match provider {
            ModelProvider::OpenAi => self
                .openai_api_key
                .as_deref()
                .ok_or_else(|| PilotError::config("OPENAI_API_KEY is not set")),
            ModelProvider::Gemini => self
                .gemini_api_key
                .as_deref()
                .ok_or_else(|| PilotError::config("GEMINI_API_KEY is not set")),
        }
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    non_empty_env(key).unwrap_or_else(|| fallback.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_surface_as_config_faults() {
        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            ..Config::default()
        };
        assert!(config.provider_key(ModelProvider::OpenAi).is_ok());
        assert!(config.provider_key(ModelProvider::Gemini).is_err());
        assert!(config.desktop_api_key().is_err());
    }
}
