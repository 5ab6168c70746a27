use std::sync::Arc;

use crate::{
    db::{self, BackendError, KeyValueBackend},
    repo::accounts::{AccountsRepo, RedisAccountsRepo},
    service::{
        accounts::{AccountsService, AccountsServiceImpl},
        config::ConfigService,
        recaptcha::{HttpRecaptchaVerifier, RecaptchaVerifier},
        signup::{SignupService, SignupServiceImpl},
    },
};

pub struct AppState {
    accounts: Arc<dyn AccountsService>,
    signup: Arc<dyn SignupService>,
    config: Arc<dyn ConfigService>,
}

impl AppState {
    pub async fn new(config: Arc<dyn ConfigService>) -> Result<Arc<Self>, BackendError> {
        let values = config.values();
        let backend = db::connect(values.redis_url.as_deref()).await?;
        let recaptcha = Arc::new(HttpRecaptchaVerifier::new(
            values.recaptcha_secret_key.clone(),
            values.recaptcha_verify_url.clone(),
        ));
        Ok(Self::with_parts(config, backend, recaptcha))
    }

    /// Builds the state over an already opened backend.
    pub fn with_parts(
        config: Arc<dyn ConfigService>,
        backend: Arc<dyn KeyValueBackend>,
        recaptcha: Arc<dyn RecaptchaVerifier>,
    ) -> Arc<Self> {
        let accounts_repo: Arc<dyn AccountsRepo> = Arc::new(RedisAccountsRepo::new(
            backend,
            config.values().email_index_mode,
        ));
        let accounts: Arc<dyn AccountsService> =
            Arc::new(AccountsServiceImpl::new(accounts_repo));
        let signup = Arc::new(SignupServiceImpl::new(accounts.clone(), recaptcha));

        Arc::new(Self {
            accounts,
            signup,
            config,
        })
    }

    pub fn accounts(&self) -> &dyn AccountsService {
        self.accounts.as_ref()
    }

    pub fn signup(&self) -> &dyn SignupService {
        self.signup.as_ref()
    }

    pub fn config(&self) -> &dyn ConfigService {
        self.config.as_ref()
    }
}
