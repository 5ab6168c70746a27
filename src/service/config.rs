use std::{env, sync::Arc};

use crate::{
    config::{Config, LogFormat},
    repo::accounts::EmailIndexMode,
};

const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:4200";

pub trait ConfigService: Send + Sync {
    fn port(&self) -> u16;
    fn values(&self) -> &Config;
}

pub struct ConfigServiceImpl {
    config: Arc<Config>,
}

impl ConfigServiceImpl {
    fn strip_wrapping_quotes(value: &str) -> &str {
        if value.len() >= 2 {
            let bytes = value.as_bytes();
            let first = bytes[0];
            let last = bytes[value.len() - 1];
            if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
                return &value[1..value.len() - 1];
            }
        }
        value
    }

    fn normalize(value: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        let normalized = Self::strip_wrapping_quotes(trimmed).trim();
        if normalized.is_empty() {
            None
        } else {
            Some(normalized.to_string())
        }
    }

    fn env_nonempty(key: &str) -> Option<String> {
        env::var(key).ok().and_then(|value| Self::normalize(&value))
    }

    fn env_u16(key: &str) -> Option<u16> {
        Self::env_nonempty(key).and_then(|value| value.parse::<u16>().ok())
    }

    fn parse_log_format(value: &str) -> Option<LogFormat> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "text" => Some(LogFormat::Text),
            "auto" => Some(LogFormat::Auto),
            _ => None,
        }
    }

    pub fn new() -> Self {
        let port = Self::env_u16("PORT").unwrap_or(3333);
        let redis_url = Self::env_nonempty("REDIS_URL");
        let email_index_mode = match Self::env_nonempty("EMAIL_INDEX_MODE") {
            Some(value) => EmailIndexMode::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "unknown EMAIL_INDEX_MODE, using check_then_set");
                EmailIndexMode::CheckThenSet
            }),
            None => EmailIndexMode::CheckThenSet,
        };
        let recaptcha_secret_key = Self::env_nonempty("RECAPTCHA_SECRET_KEY");
        let recaptcha_verify_url = Self::env_nonempty("RECAPTCHA_VERIFY_URL")
            .unwrap_or_else(|| DEFAULT_RECAPTCHA_VERIFY_URL.to_string());
        let cors_allowed_origin = Self::env_nonempty("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGIN.to_string());
        let log_format = Self::env_nonempty("LOG_FORMAT")
            .and_then(|value| Self::parse_log_format(&value))
            .unwrap_or_default();

        Self {
            config: Arc::new(Config {
                port,
                redis_url,
                email_index_mode,
                recaptcha_secret_key,
                recaptcha_verify_url,
                cors_allowed_origin,
                log_format,
            }),
        }
    }
}

impl Default for ConfigServiceImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService for ConfigServiceImpl {
    fn port(&self) -> u16 {
        self.config.port
    }

    fn values(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_quotes_and_blanks() {
        assert_eq!(
            ConfigServiceImpl::normalize("  \"redis://cache:6379\" "),
            Some("redis://cache:6379".to_string())
        );
        assert_eq!(ConfigServiceImpl::normalize("''"), None);
        assert_eq!(ConfigServiceImpl::normalize("   "), None);
    }

    #[test]
    fn log_format_is_case_insensitive() {
        assert_eq!(
            ConfigServiceImpl::parse_log_format("JSON"),
            Some(LogFormat::Json)
        );
        assert_eq!(ConfigServiceImpl::parse_log_format("pretty"), None);
    }
}
