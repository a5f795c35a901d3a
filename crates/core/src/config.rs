use crate::ConfigError;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";
pub const EMBEDDING_MODEL_VAR: &str = "GEMINI_EMBEDDING_MODEL";
pub const COMPLETION_MODEL_VAR: &str = "GEMINI_COMPLETION_MODEL";
pub const TIMEOUT_VAR: &str = "GEMINI_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";
pub const DEFAULT_COMPLETION_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: Url,
    pub embedding_model: String,
    pub completion_model: String,
    pub request_timeout: Duration,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("embedding_model", &self.embedding_model)
            .field("completion_model", &self.completion_model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(ConfigError::MissingCredential(API_KEY_VAR.to_string()));
        }

        Ok(Self {
            api_key,
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key).and_then(|value| {
                let value = value.trim().to_string();
                if value.is_empty() {
                    None
                } else {
                    Some(value)
                }
            })
        };

        let api_key =
            value(API_KEY_VAR).ok_or_else(|| ConfigError::MissingCredential(API_KEY_VAR.to_string()))?;
        let mut config = Self::new(api_key)?;

        if let Some(base_url) = value(BASE_URL_VAR) {
            config.base_url = parse_base_url(&base_url)?;
        }
        if let Some(model) = value(EMBEDDING_MODEL_VAR) {
            config.embedding_model = model;
        }
        if let Some(model) = value(COMPLETION_MODEL_VAR) {
            config.completion_model = model;
        }
        if let Some(timeout) = value(TIMEOUT_VAR) {
            let seconds = timeout
                .parse::<u64>()
                .map_err(|error| ConfigError::InvalidValue {
                    key: TIMEOUT_VAR.to_string(),
                    details: error.to_string(),
                })?;
            config.request_timeout = Duration::from_secs(seconds);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|error| ConfigError::InvalidValue {
        key: BASE_URL_VAR.to_string(),
        details: error.to_string(),
    })
}
