use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    service::{
        recaptcha::RecaptchaError,
        signup::{SignupCommand, SignupError},
    },
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub recaptcha_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct SignupFieldError {
    pub field: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SignupFieldError>,
}

fn failure_status(err: &SignupError) -> StatusCode {
    match err {
        SignupError::Validation(_) | SignupError::CaptchaRejected => StatusCode::BAD_REQUEST,
        SignupError::CaptchaUnavailable(RecaptchaError::NotConfigured) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        SignupError::CaptchaUnavailable(RecaptchaError::Request(_)) => StatusCode::BAD_GATEWAY,
        SignupError::Registration(err) => match err.code {
            "duplicate_email" | "invalid_account" => StatusCode::BAD_REQUEST,
            "backend_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Registered", body = SignupResult),
        (status = 400, description = "Invalid payload, rejected captcha or duplicate email", body = SignupResult),
        (status = 503, description = "Account store unavailable", body = SignupResult)
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Response {
    let command = SignupCommand {
        username: payload.username,
        email: payload.email,
        password: payload.password,
        recaptcha_token: payload.recaptcha_token,
    };

    match state.signup().signup(command).await {
        Ok(account) => (
            StatusCode::OK,
            Json(SignupResult {
                success: true,
                message: "User registered successfully".to_string(),
                user_id: Some(account.id),
                errors: Vec::new(),
            }),
        )
            .into_response(),
        Err(err) => {
            let status = failure_status(&err);
            if status.is_server_error() {
                tracing::error!(error = %err.message(), "signup failed");
            }
            let errors = match &err {
                SignupError::Validation(errors) => errors
                    .iter()
                    .map(|err| SignupFieldError {
                        field: err.field.to_string(),
                        message: err.message.to_string(),
                    })
                    .collect(),
                _ => Vec::new(),
            };
            (
                status,
                Json(SignupResult {
                    success: false,
                    message: err.message(),
                    user_id: None,
                    errors,
                }),
            )
                .into_response()
        }
    }
}
