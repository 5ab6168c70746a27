use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    entities::accounts::Account,
    service::{
        accounts::{AccountError, AccountsService, RegisterInput},
        recaptcha::{RecaptchaError, RecaptchaVerifier},
    },
};

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 50;
const PASSWORD_MIN_LEN: usize = 6;

pub struct SignupCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub recaptcha_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug)]
pub enum SignupError {
    Validation(Vec<FieldError>),
    CaptchaRejected,
    CaptchaUnavailable(RecaptchaError),
    Registration(AccountError),
}

impl SignupError {
    pub fn message(&self) -> String {
        match self {
            SignupError::Validation(errors) => {
                let messages: Vec<&str> = errors.iter().map(|err| err.message).collect();
                format!("Validation failed: {}", messages.join(", "))
            }
            SignupError::CaptchaRejected => {
                "reCAPTCHA verification failed. Please try again.".to_string()
            }
            SignupError::CaptchaUnavailable(err) => err.to_string(),
            SignupError::Registration(err) => format!("Registration failed: {}", err.message),
        }
    }
}

fn is_username_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

// One '@' that is neither first nor last, and no whitespace.
fn is_email_address(value: &str) -> bool {
    let Some(at) = value.find('@') else {
        return false;
    };
    at > 0
        && at < value.len() - 1
        && value.matches('@').count() == 1
        && !value.chars().any(char::is_whitespace)
}

/// Field rules for a sign-up; the first failing rule per field is reported.
pub fn validate(command: &SignupCommand) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let mut fail = |field: &'static str, message: &'static str| {
        errors.push(FieldError { field, message })
    };

    let username = command.username.as_str();
    let username_len = username.chars().count();
    if username.trim().is_empty() {
        fail("username", "Username is required");
    } else if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
        fail("username", "Username must be between 3 and 50 characters");
    } else if !username.chars().all(is_username_char) {
        fail(
            "username",
            "Username can only contain letters, numbers, and underscores",
        );
    }

    if command.email.trim().is_empty() {
        fail("email", "Email is required");
    } else if !is_email_address(command.email.trim()) {
        fail("email", "A valid email is required");
    }

    let password = command.password.as_str();
    if password.is_empty() {
        fail("password", "Password is required");
    } else if password.chars().count() < PASSWORD_MIN_LEN {
        fail("password", "Password must be at least 6 characters long");
    } else if !(password.chars().any(|ch| ch.is_ascii_lowercase())
        && password.chars().any(|ch| ch.is_ascii_uppercase())
        && password.chars().any(|ch| ch.is_ascii_digit()))
    {
        fail(
            "password",
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        );
    }

    if command.recaptcha_token.trim().is_empty() {
        fail("recaptchaToken", "reCAPTCHA verification is required");
    }

    errors
}

#[async_trait]
pub trait SignupService: Send + Sync {
    async fn signup(&self, command: SignupCommand) -> Result<Account, SignupError>;
}

pub struct SignupServiceImpl {
    accounts: Arc<dyn AccountsService>,
    recaptcha: Arc<dyn RecaptchaVerifier>,
}

impl SignupServiceImpl {
    pub fn new(accounts: Arc<dyn AccountsService>, recaptcha: Arc<dyn RecaptchaVerifier>) -> Self {
        Self {
            accounts,
            recaptcha,
        }
    }
}

#[async_trait]
impl SignupService for SignupServiceImpl {
    async fn signup(&self, command: SignupCommand) -> Result<Account, SignupError> {
        let errors = validate(&command);
        if !errors.is_empty() {
            return Err(SignupError::Validation(errors));
        }

        let accepted = self
            .recaptcha
            .verify(&command.recaptcha_token)
            .await
            .map_err(SignupError::CaptchaUnavailable)?;
        if !accepted {
            return Err(SignupError::CaptchaRejected);
        }

        self.accounts
            .register(RegisterInput {
                username: command.username,
                email: command.email,
                password: command.password,
                first_name: None,
                last_name: None,
            })
            .await
            .map_err(SignupError::Registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryBackend,
        repo::accounts::{EmailIndexMode, RedisAccountsRepo},
        service::accounts::AccountsServiceImpl,
    };

    struct FixedVerifier(bool);

    #[async_trait]
    impl RecaptchaVerifier for FixedVerifier {
        async fn verify(&self, _token: &str) -> Result<bool, RecaptchaError> {
            Ok(self.0)
        }
    }

    fn service(captcha_ok: bool) -> SignupServiceImpl {
        let repo = RedisAccountsRepo::new(Arc::new(MemoryBackend::new()), EmailIndexMode::default());
        let accounts = AccountsServiceImpl::new(Arc::new(repo));
        SignupServiceImpl::new(Arc::new(accounts), Arc::new(FixedVerifier(captcha_ok)))
    }

    fn command(username: &str, email: &str, password: &str) -> SignupCommand {
        SignupCommand {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            recaptcha_token: "token".to_string(),
        }
    }

    #[test]
    fn validate_accepts_a_well_formed_command() {
        assert!(validate(&command("alice_01", "a@x.com", "Secret1")).is_empty());
    }

    #[test]
    fn validate_reports_one_error_per_field() {
        let mut bad = command("al", "not-an-email", "secret");
        bad.recaptcha_token = String::new();

        let fields: Vec<&str> = validate(&bad).iter().map(|err| err.field).collect();
        assert_eq!(fields, vec!["username", "email", "password", "recaptchaToken"]);
    }

    #[test]
    fn validate_checks_username_characters_and_password_mix() {
        let errors = validate(&command("alice!", "a@x.com", "alllower1"));
        assert_eq!(
            errors,
            vec![
                FieldError {
                    field: "username",
                    message: "Username can only contain letters, numbers, and underscores",
                },
                FieldError {
                    field: "password",
                    message: "Password must contain at least one uppercase letter, one lowercase letter, and one number",
                },
            ]
        );
    }

    #[test]
    fn password_letter_classes_are_ascii_only() {
        let errors = validate(&command("alice", "a@x.com", "Éabc12"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password");

        let errors = validate(&command("alice", "a@x.com", "ßbcDE1"));
        assert!(errors.is_empty());
    }

    #[test]
    fn email_shape_rules() {
        assert!(is_email_address("a@x"));
        assert!(!is_email_address("@x.com"));
        assert!(!is_email_address("a@"));
        assert!(!is_email_address("a@b@c"));
        assert!(!is_email_address("a b@c.com"));
    }

    #[tokio::test]
    async fn signup_registers_an_account() {
        let signup = service(true);
        let account = signup
            .signup(command("alice", "a@x.com", "Secret1"))
            .await
            .expect("signup should succeed");
        assert_eq!(account.username.as_deref(), Some("alice"));
        assert!(!account.id.is_empty());
    }

    #[tokio::test]
    async fn rejected_captcha_stops_registration() {
        let signup = service(false);
        let err = signup
            .signup(command("alice", "a@x.com", "Secret1"))
            .await
            .expect_err("captcha must be enforced");
        assert!(matches!(err, SignupError::CaptchaRejected));
        assert_eq!(
            err.message(),
            "reCAPTCHA verification failed. Please try again."
        );
    }

    #[tokio::test]
    async fn duplicate_email_is_a_registration_failure() {
        let signup = service(true);
        signup
            .signup(command("alice", "a@x.com", "Secret1"))
            .await
            .expect("first signup should succeed");

        let err = signup
            .signup(command("alice2", "A@X.COM", "Secret1"))
            .await
            .expect_err("duplicate email must fail");
        assert_eq!(
            err.message(),
            "Registration failed: Email address is already in use."
        );
    }
}
