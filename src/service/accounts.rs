use argon2::{password_hash::PasswordHash, Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    entities::accounts::{normalize_lookup, Account},
    repo::accounts::{AccountsRepo, StoreError},
};

#[derive(Debug)]
pub struct AccountError {
    pub code: &'static str,
    pub message: String,
}

impl AccountError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => {
                AccountError::new("duplicate_email", "Email address is already in use.")
            }
            StoreError::NotFound => AccountError::new("not_found", "account not found"),
            StoreError::InvalidAccount(reason) => AccountError::new("invalid_account", reason),
            StoreError::BackendUnavailable(err) => {
                AccountError::new("backend_unavailable", err.to_string())
            }
            err @ StoreError::CorruptRecord { .. } => {
                AccountError::new("corrupt_record", err.to_string())
            }
        }
    }
}

pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[async_trait]
pub trait AccountsService: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Result<Account, AccountError>;
    async fn get(&self, id: &str) -> Result<Option<Account>, AccountError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError>;
    async fn update(&self, account: Account) -> Result<Account, AccountError>;
    async fn delete(&self, id: &str) -> Result<(), AccountError>;
    /// Checks `password` against the stored hash; `false` when the account has none.
    fn check_password(&self, account: &Account, password: &str) -> bool;
}

pub struct AccountsServiceImpl {
    accounts_repo: Arc<dyn AccountsRepo>,
}

impl AccountsServiceImpl {
    pub fn new(accounts_repo: Arc<dyn AccountsRepo>) -> Self {
        Self { accounts_repo }
    }

    fn hash_password(password: &str) -> Result<String, AccountError> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = argon2::password_hash::SaltString::encode_b64(&salt)
            .map_err(|err| AccountError::new("password_hash_failed", err.to_string()))?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| AccountError::new("password_hash_failed", err.to_string()))?
            .to_string();
        Ok(hash)
    }

    fn new_security_stamp() -> String {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    fn new_concurrency_stamp() -> String {
        Uuid::new_v4().to_string()
    }

    fn non_empty(value: Option<String>) -> Option<String> {
        value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn normalize(account: &mut Account) {
        account.normalized_username = account.username.as_deref().and_then(normalize_lookup);
        account.normalized_email = account.email.as_deref().and_then(normalize_lookup);
    }
}

#[async_trait]
impl AccountsService for AccountsServiceImpl {
    async fn register(&self, input: RegisterInput) -> Result<Account, AccountError> {
        let password_hash = Self::hash_password(&input.password)?;
        let mut account = Account {
            username: Self::non_empty(Some(input.username)),
            email: Self::non_empty(Some(input.email)),
            email_confirmed: false,
            password_hash: Some(password_hash),
            security_stamp: Some(Self::new_security_stamp()),
            concurrency_stamp: Some(Self::new_concurrency_stamp()),
            lockout_enabled: true,
            first_name: Self::non_empty(input.first_name),
            last_name: Self::non_empty(input.last_name),
            created_at: Utc::now(),
            ..Default::default()
        };
        Self::normalize(&mut account);

        let account = self.accounts_repo.create(account).await?;
        tracing::info!(id = %account.id, "account registered");
        Ok(account)
    }

    async fn get(&self, id: &str) -> Result<Option<Account>, AccountError> {
        Ok(self.accounts_repo.find_by_id(id).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let Some(normalized) = normalize_lookup(email) else {
            return Ok(None);
        };
        Ok(self.accounts_repo.find_by_email(&normalized).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError> {
        let Some(normalized) = normalize_lookup(username) else {
            return Ok(None);
        };
        Ok(self.accounts_repo.find_by_username(&normalized).await?)
    }

    async fn update(&self, mut account: Account) -> Result<Account, AccountError> {
        Self::normalize(&mut account);
        account.concurrency_stamp = Some(Self::new_concurrency_stamp());
        Ok(self.accounts_repo.update(account).await?)
    }

    async fn delete(&self, id: &str) -> Result<(), AccountError> {
        self.accounts_repo.delete(id).await?;
        tracing::info!(id, "account deleted");
        Ok(())
    }

    fn check_password(&self, account: &Account, password: &str) -> bool {
        let Some(hash) = account.password_hash.as_deref() else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryBackend,
        repo::accounts::{EmailIndexMode, RedisAccountsRepo},
    };

    fn service() -> AccountsServiceImpl {
        let repo = RedisAccountsRepo::new(Arc::new(MemoryBackend::new()), EmailIndexMode::default());
        AccountsServiceImpl::new(Arc::new(repo))
    }

    fn input(username: &str, email: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: email.to_string(),
            password: "Passw0rd".to_string(),
            first_name: None,
            last_name: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn register_fills_identity_fields() -> Result<(), AccountError> {
        let accounts = service();
        let account = accounts.register(input("alice", " a@x.com ")).await?;

        assert!(!account.id.is_empty());
        assert_eq!(account.email.as_deref(), Some("a@x.com"));
        assert_eq!(account.normalized_email.as_deref(), Some("A@X.COM"));
        assert_eq!(account.normalized_username.as_deref(), Some("ALICE"));
        assert!(account.lockout_enabled);
        assert!(!account.email_confirmed);
        assert!(account.security_stamp.is_some());
        assert_eq!(account.last_name, None);
        assert!(accounts.check_password(&account, "Passw0rd"));
        assert!(!accounts.check_password(&account, "wrong"));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_maps_to_a_coded_error() -> Result<(), AccountError> {
        let accounts = service();
        accounts.register(input("alice", "a@x.com")).await?;

        let err = accounts
            .register(input("bob", "A@X.com"))
            .await
            .expect_err("second registration must fail");
        assert_eq!(err.code, "duplicate_email");
        assert_eq!(err.message, "Email address is already in use.");
        Ok(())
    }

    #[tokio::test]
    async fn lookups_normalize_their_input() -> Result<(), AccountError> {
        let accounts = service();
        let created = accounts.register(input("alice", "a@x.com")).await?;

        let found = accounts.find_by_email("  A@x.COM").await?;
        assert_eq!(found.map(|account| account.id), Some(created.id));
        assert!(accounts.find_by_username("alice").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_rotates_the_concurrency_stamp() -> Result<(), AccountError> {
        let accounts = service();
        let created = accounts.register(input("alice", "a@x.com")).await?;

        let mut changed = created.clone();
        changed.email = Some("alice@y.org".to_string());
        let updated = accounts.update(changed).await?;

        assert_ne!(updated.concurrency_stamp, created.concurrency_stamp);
        assert_eq!(updated.normalized_email.as_deref(), Some("ALICE@Y.ORG"));
        assert!(accounts.find_by_email("a@x.com").await?.is_none());
        Ok(())
    }
}
