use chrono::{DateTime, Utc};

/// A stored account. Optional text fields use `None` for "unset"; the record
/// layout writes them as empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub username: Option<String>,
    pub normalized_username: Option<String>,
    pub email: Option<String>,
    pub normalized_email: Option<String>,
    pub email_confirmed: bool,
    pub password_hash: Option<String>,
    pub security_stamp: Option<String>,
    pub concurrency_stamp: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_confirmed: bool,
    pub two_factor_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub lockout_enabled: bool,
    pub access_failed_count: u32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Normalized email when one is set and non-empty.
    pub fn index_email(&self) -> Option<&str> {
        self.normalized_email
            .as_deref()
            .filter(|value| !value.is_empty())
    }
}

/// Lookup form used for the email index and username comparisons.
///
/// Upper-cased to match the keys already present in deployed data.
pub fn normalize_lookup(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_uppercase())
}
