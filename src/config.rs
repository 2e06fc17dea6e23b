use crate::core::batch::DEFAULT_CHUNK_SIZE;
use crate::core::storage::{COMMENTS_FILE, FINAL_RESULTS_FILE, RAW_RESULTS_FILE};
use crate::error::{Error, Result};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const YOUTUBE_API_KEY_ENV: &str = "YOUTUBE_API_KEY";
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const MODEL_ENV: &str = "COMMENTLENS_MODEL";
pub const API_BASE_ENV: &str = "COMMENTLENS_API_BASE";
pub const CHUNK_SIZE_ENV: &str = "COMMENTLENS_CHUNK_SIZE";
pub const MAX_ITER_ENV: &str = "COMMENTLENS_MAX_ITER";
pub const MAX_RPM_ENV: &str = "COMMENTLENS_MAX_RPM";
pub const TIMEOUT_ENV: &str = "COMMENTLENS_TIMEOUT_SECS";

const DEFAULT_MODEL: &str = "llama3-8b-8192";
const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MAX_ITERATIONS: u32 = 10;
const DEFAULT_MAX_RPM: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub max_iterations: u32,
    pub max_rpm: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_rpm: DEFAULT_MAX_RPM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub youtube_api_key: Option<String>,
    pub agent: AgentSettings,
    pub chunk_size: NonZeroUsize,
    pub timeout: Option<Duration>,
    pub comments_path: PathBuf,
    pub raw_results_path: PathBuf,
    pub final_results_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            agent: AgentSettings::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
            comments_path: PathBuf::from(COMMENTS_FILE),
            raw_results_path: PathBuf::from(RAW_RESULTS_FILE),
            final_results_path: PathBuf::from(FINAL_RESULTS_FILE),
        }
    }
}

impl Settings {
    /// Read settings from the process environment. A `.env` file in the
    /// working directory is loaded first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Settings {
            youtube_api_key: value(YOUTUBE_API_KEY_ENV),
            ..Settings::default()
        };
        settings.agent.api_key = value(GROQ_API_KEY_ENV);

        if let Some(model) = value(MODEL_ENV) {
            settings.agent.model = model;
        }
        if let Some(api_base) = value(API_BASE_ENV) {
            settings.agent.api_base = api_base;
        }
        if let Some(raw) = value(CHUNK_SIZE_ENV) {
            settings.chunk_size = parse_var(CHUNK_SIZE_ENV, &raw)?;
        }
        if let Some(raw) = value(MAX_ITER_ENV) {
            settings.agent.max_iterations = parse_var(MAX_ITER_ENV, &raw)?;
        }
        if let Some(raw) = value(MAX_RPM_ENV) {
            settings.agent.max_rpm = parse_var(MAX_RPM_ENV, &raw)?;
        }
        if let Some(raw) = value(TIMEOUT_ENV) {
            settings.timeout = Some(Duration::from_secs(parse_var(TIMEOUT_ENV, &raw)?));
        }

        Ok(settings)
    }

    pub fn require_youtube_key(&self) -> Result<&str> {
        self.youtube_api_key
            .as_deref()
            .ok_or_else(|| Error::config(format!("{YOUTUBE_API_KEY_ENV} is not set")))
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| Error::config(format!("invalid value {raw:?} for {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.chunk_size.get(), 20);
        assert_eq!(settings.agent.max_iterations, 10);
        assert_eq!(settings.agent.max_rpm, 100);
        assert!(settings.timeout.is_none());
    }

    #[test]
    fn reads_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (YOUTUBE_API_KEY_ENV, "yt-key"),
            (GROQ_API_KEY_ENV, " groq-key "),
            (MODEL_ENV, "llama-3.1-8b-instant"),
            (CHUNK_SIZE_ENV, "5"),
            (MAX_ITER_ENV, "3"),
            (MAX_RPM_ENV, "30"),
            (TIMEOUT_ENV, "90"),
        ]))
        .unwrap();

        assert_eq!(settings.require_youtube_key().unwrap(), "yt-key");
        assert_eq!(settings.agent.api_key.as_deref(), Some("groq-key"));
        assert_eq!(settings.agent.model, "llama-3.1-8b-instant");
        assert_eq!(settings.chunk_size.get(), 5);
        assert_eq!(settings.agent.max_iterations, 3);
        assert_eq!(settings.agent.max_rpm, 30);
        assert_eq!(settings.timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = Settings::from_lookup(lookup(&[(CHUNK_SIZE_ENV, "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let settings = Settings::from_lookup(lookup(&[(YOUTUBE_API_KEY_ENV, "   ")])).unwrap();
        assert!(settings.require_youtube_key().is_err());
    }
}
