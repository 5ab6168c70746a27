use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum RecaptchaError {
    #[error("reCAPTCHA secret key is not configured")]
    NotConfigured,
    #[error("reCAPTCHA request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct VerifyResponse {
    success: Option<bool>,
}

#[async_trait]
pub trait RecaptchaVerifier: Send + Sync {
    /// `Ok(false)` when the provider rejects the token.
    async fn verify(&self, token: &str) -> Result<bool, RecaptchaError>;
}

pub struct HttpRecaptchaVerifier {
    client: reqwest::Client,
    secret_key: Option<String>,
    verify_url: String,
}

impl HttpRecaptchaVerifier {
    pub fn new(secret_key: Option<String>, verify_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            verify_url,
        }
    }
}

#[async_trait]
impl RecaptchaVerifier for HttpRecaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<bool, RecaptchaError> {
        let secret = self
            .secret_key
            .as_deref()
            .ok_or(RecaptchaError::NotConfigured)?;

        let res = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", secret), ("response", token)])
            .send()
            .await?;
        let body: VerifyResponse = res.json().await?;

        let success = body.success.unwrap_or(false);
        if !success {
            tracing::info!("reCAPTCHA token rejected");
        }
        Ok(success)
    }
}
