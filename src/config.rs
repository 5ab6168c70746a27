use crate::repo::accounts::EmailIndexMode;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
    #[default]
    Auto,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    // Unset means the in-memory backend.
    pub redis_url: Option<String>,
    pub email_index_mode: EmailIndexMode,
    pub recaptcha_secret_key: Option<String>,
    pub recaptcha_verify_url: String,
    pub cors_allowed_origin: String,
    pub log_format: LogFormat,
}
