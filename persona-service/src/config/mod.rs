use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Gemini REST API base URL.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct PersonaConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Secret<String>,
    pub api_base: String,
    pub default_model: String,
    /// Outbound request timeout. `None` leaves the call unbounded.
    pub request_timeout: Option<Duration>,
}

impl PersonaConfig {
    /// Load everything the service needs before it may accept traffic.
    ///
    /// Fails when `GEMINI_API_KEY` is unset or blank.
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let gemini = GeminiSettings::from_lookup(|key| env::var(key).ok())?;

        Ok(PersonaConfig { common, gemini })
    }
}

impl GeminiSettings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(Secret::new)
            .ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "GEMINI_API_KEY not found in environment. Put it in a .env file or export it."
                ))
            })?;

        let request_timeout = match lookup("GEMINI_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.trim().parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("invalid GEMINI_TIMEOUT_SECS: {}", e))
            })?)),
            None => None,
        };

        Ok(GeminiSettings {
            api_key,
            api_base: lookup("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            default_model: lookup("GEMINI_DEFAULT_MODEL")
                .filter(|model| !model.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout,
        })
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}
