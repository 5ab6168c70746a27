//! Account directory on top of a plain key-value store.
//!
//! Each account is one hash at `User:{id}`. Email uniqueness is kept by a
//! string key `User:Email:{normalized email}` holding the owning id. The store
//! has no multi-key transactions, so every operation below is a fixed sequence
//! of single-key writes:
//!
//! * With [`EmailIndexMode::CheckThenSet`], two creates for the same email can
//!   both pass the lookup before either writes the index. Both hashes are
//!   stored and the index keeps whichever write lands last; the other account
//!   is then only reachable by id.
//! * `update` does not re-check uniqueness and may take over an index key that
//!   another account owns.
//! * Nothing is rolled back if a caller drops the future after the first write.
//!
//! [`EmailIndexMode::SetIfAbsent`] closes the create race by claiming the index
//! key with `SET NX` before writing the hash.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{BackendError, KeyValueBackend},
    entities::accounts::Account,
    repo::account_record::{self, CodecError},
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email address is already in use")]
    DuplicateEmail,
    #[error("account not found")]
    NotFound,
    #[error("invalid account: {0}")]
    InvalidAccount(&'static str),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),
    #[error("corrupt record at {key}: {source}")]
    CorruptRecord {
        key: String,
        #[source]
        source: CodecError,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmailIndexMode {
    #[default]
    CheckThenSet,
    SetIfAbsent,
}

impl EmailIndexMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "check_then_set" => Some(Self::CheckThenSet),
            "set_if_absent" => Some(Self::SetIfAbsent),
            _ => None,
        }
    }
}

pub fn account_key(id: &str) -> String {
    format!("User:{}", id)
}

pub fn email_key(normalized_email: &str) -> String {
    format!("User:Email:{}", normalized_email)
}

#[async_trait]
pub trait AccountsRepo: Send + Sync {
    /// Stores a new account, assigning an id when it has none.
    async fn create(&self, account: Account) -> Result<Account, StoreError>;
    /// Rewrites the stored account; `id` and `created_at` keep their stored values.
    async fn update(&self, account: Account) -> Result<Account, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError>;
    async fn find_by_email(&self, normalized_email: &str) -> Result<Option<Account>, StoreError>;
    /// Always `None`: usernames are not unique and have no index.
    async fn find_by_username(
        &self,
        normalized_username: &str,
    ) -> Result<Option<Account>, StoreError>;
}

pub struct RedisAccountsRepo {
    backend: Arc<dyn KeyValueBackend>,
    email_index: EmailIndexMode,
}

impl RedisAccountsRepo {
    pub fn new(backend: Arc<dyn KeyValueBackend>, email_index: EmailIndexMode) -> Self {
        Self {
            backend,
            email_index,
        }
    }

    async fn write_record(&self, account: &Account) -> Result<(), StoreError> {
        let fields = account_record::encode(account);
        self.backend
            .hash_set(&account_key(&account.id), &fields)
            .await?;
        Ok(())
    }

    async fn create_checked(&self, mut account: Account) -> Result<Account, StoreError> {
        if let Some(email) = account.index_email() {
            if self.find_by_email(email).await?.is_some() {
                tracing::info!(email, "create rejected: email already indexed");
                return Err(StoreError::DuplicateEmail);
            }
        }

        if account.id.is_empty() {
            account.id = Uuid::new_v4().to_string();
        }

        self.write_record(&account).await?;
        if let Some(email) = account.index_email() {
            self.backend
                .string_set(&email_key(email), &account.id)
                .await?;
        }
        Ok(account)
    }

    async fn create_claimed(&self, mut account: Account) -> Result<Account, StoreError> {
        if account.id.is_empty() {
            account.id = Uuid::new_v4().to_string();
        }

        let Some(email) = account.index_email().map(str::to_string) else {
            self.write_record(&account).await?;
            return Ok(account);
        };

        let index = email_key(&email);
        if !self
            .backend
            .string_set_if_absent(&index, &account.id)
            .await?
        {
            tracing::info!(email = %email, "create rejected: email claim lost");
            return Err(StoreError::DuplicateEmail);
        }

        if let Err(err) = self.write_record(&account).await {
            if let Err(release_err) = self.backend.key_delete(&index).await {
                tracing::warn!(
                    email = %email,
                    error = %release_err,
                    "failed to release email claim after write error"
                );
            }
            return Err(err);
        }
        Ok(account)
    }
}

#[async_trait]
impl AccountsRepo for RedisAccountsRepo {
    async fn create(&self, account: Account) -> Result<Account, StoreError> {
        let account = match self.email_index {
            EmailIndexMode::CheckThenSet => self.create_checked(account).await?,
            EmailIndexMode::SetIfAbsent => self.create_claimed(account).await?,
        };
        tracing::debug!(id = %account.id, "account created");
        Ok(account)
    }

    async fn update(&self, mut account: Account) -> Result<Account, StoreError> {
        if account.id.is_empty() {
            return Err(StoreError::InvalidAccount("update requires an id"));
        }

        // Only CreatedAt and NormalizedEmail are read back; the rest is overwritten.
        let key = account_key(&account.id);
        let stored = self.backend.hash_get_all(&key).await?;
        if stored.is_empty() {
            return Err(StoreError::NotFound);
        }
        let created_at = account_record::stored_created_at(&stored)
            .map_err(|source| StoreError::CorruptRecord { key, source })?;
        if let Some(created_at) = created_at {
            account.created_at = created_at;
        }

        if let Some(old_email) = account_record::stored_index_email(&stored) {
            let unchanged = account
                .index_email()
                .is_some_and(|new_email| new_email.to_lowercase() == old_email.to_lowercase());
            if !unchanged {
                self.backend.key_delete(&email_key(old_email)).await?;
            }
        }

        self.write_record(&account).await?;

        if let Some(email) = account.index_email() {
            self.backend
                .string_set(&email_key(email), &account.id)
                .await?;
        }

        tracing::debug!(id = %account.id, "account updated");
        Ok(account)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if id.is_empty() {
            return Err(StoreError::InvalidAccount("delete requires an id"));
        }

        let key = account_key(id);
        let stored = self.backend.hash_get_all(&key).await?;
        if stored.is_empty() {
            return Err(StoreError::NotFound);
        }

        self.backend.key_delete(&key).await?;
        // Removed even if the key now points at another account.
        if let Some(email) = account_record::stored_index_email(&stored) {
            self.backend.key_delete(&email_key(email)).await?;
        }

        tracing::debug!(id, "account deleted");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        if id.is_empty() {
            return Ok(None);
        }
        let key = account_key(id);
        let fields = self.backend.hash_get_all(&key).await?;
        account_record::decode(&fields).map_err(|source| StoreError::CorruptRecord { key, source })
    }

    async fn find_by_email(&self, normalized_email: &str) -> Result<Option<Account>, StoreError> {
        if normalized_email.is_empty() {
            return Ok(None);
        }
        let Some(id) = self
            .backend
            .string_get(&email_key(normalized_email))
            .await?
        else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn find_by_username(
        &self,
        _normalized_username: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(None)
    }
}
