//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default persona sent as the system message of every completion.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert GTM strategist. You write practical, \
specific go-to-market playbooks for product teams, grounded in the inputs you are given.";

/// Settings for the completion backend.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Model identifier sent with every request.
    pub model: String,
    /// Base URL of an OpenAI-compatible API (no trailing `/chat/completions`).
    pub base_url: String,
    /// Upper bound on a single completion call.
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Credential from the process environment. When absent, the web UI asks
    /// each session for its own key.
    pub api_key: Option<SecretString>,
    pub llm: LlmSettings,
    pub bind_addr: String,
    pub port: u16,
    /// Sessions idle longer than this are dropped by the expiry sweep.
    pub session_idle_timeout: Duration,
    /// Directory for daily-rolling log files, if file logging is wanted.
    pub log_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            llm: LlmSettings::default(),
            bind_addr: "0.0.0.0".to_string(),
            port: 8501,
            session_idle_timeout: Duration::from_secs(60 * 60),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("OPENAI_API_KEY").map(SecretString::from);

        let llm = LlmSettings {
            model: non_empty("GTM_MODEL").unwrap_or(defaults.llm.model),
            base_url: non_empty("GTM_LLM_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.llm.base_url),
            timeout: match non_empty("GTM_LLM_TIMEOUT_SECS") {
                Some(raw) => Duration::from_secs(parse_value("GTM_LLM_TIMEOUT_SECS", &raw)?),
                None => defaults.llm.timeout,
            },
            temperature: match non_empty("GTM_TEMPERATURE") {
                Some(raw) => parse_value("GTM_TEMPERATURE", &raw)?,
                None => defaults.llm.temperature,
            },
            max_tokens: match non_empty("GTM_MAX_TOKENS") {
                Some(raw) => parse_value("GTM_MAX_TOKENS", &raw)?,
                None => defaults.llm.max_tokens,
            },
        };

        let port = match non_empty("GTM_PORT") {
            Some(raw) => parse_value("GTM_PORT", &raw)?,
            None => defaults.port,
        };

        let session_idle_timeout = match non_empty("GTM_SESSION_IDLE_MIN") {
            Some(raw) => {
                let minutes: u64 = parse_value("GTM_SESSION_IDLE_MIN", &raw)?;
                let secs = minutes
                    .checked_mul(60)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: "GTM_SESSION_IDLE_MIN".to_string(),
                        message: format!("{minutes} minutes is too large"),
                    })?;
                Duration::from_secs(secs)
            }
            None => defaults.session_idle_timeout,
        };

        Ok(Self {
            api_key,
            llm,
            bind_addr: non_empty("GTM_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
            session_idle_timeout,
            log_dir: non_empty("GTM_LOG_DIR"),
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.llm.model, "gpt-4-turbo");
        assert_eq!(config.port, 8501);
        assert_eq!(config.llm.timeout, Duration::from_secs(120));
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3600));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("GTM_MODEL", "gpt-4o"),
            ("GTM_LLM_BASE_URL", "http://localhost:9000/v1/"),
            ("GTM_LLM_TIMEOUT_SECS", "30"),
            ("GTM_PORT", "9090"),
            ("GTM_SESSION_IDLE_MIN", "5"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.unwrap().expose_secret(), "sk-test");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url, "http://localhost:9000/v1");
        assert_eq!(config.llm.timeout, Duration::from_secs(30));
        assert_eq!(config.port, 9090);
        assert_eq!(config.session_idle_timeout, Duration::from_secs(300));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "   ")])).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = AppConfig::from_lookup(lookup_from(&[("GTM_PORT", "eighty")])).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "GTM_PORT"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn oversized_idle_minutes_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[(
            "GTM_SESSION_IDLE_MIN",
            "18446744073709551615",
        )]))
        .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "GTM_SESSION_IDLE_MIN"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
