use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::{entities::accounts::Account, service::accounts::AccountError, state::AppState};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailQuery {
    pub email: String,
}

/// Public view of an account; credentials and stamps are never returned.
#[derive(Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub email_confirmed: bool,
    pub phone_number: Option<String>,
    pub two_factor_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            email_confirmed: account.email_confirmed,
            phone_number: account.phone_number,
            two_factor_enabled: account.two_factor_enabled,
            lockout_end: account.lockout_end,
            first_name: account.first_name,
            last_name: account.last_name,
            created_at: account.created_at,
        }
    }
}

fn error_status(err: AccountError) -> StatusCode {
    match err.code {
        "not_found" => StatusCode::NOT_FOUND,
        "invalid_account" => StatusCode::BAD_REQUEST,
        "backend_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
        _ => {
            tracing::error!(code = err.code, error = %err.message, "account lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn found(account: Option<Account>) -> Result<Json<AccountResponse>, StatusCode> {
    match account {
        Some(account) => Ok(Json(account.into())),
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(
        ("id" = String, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Account", body = AccountResponse),
        (status = 404, description = "Not found"),
        (status = 503, description = "Account store unavailable")
    ),
    tag = "accounts"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, StatusCode> {
    let account = state.accounts().get(&id).await.map_err(error_status)?;
    found(account)
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    params(EmailQuery),
    responses(
        (status = 200, description = "Account owning the email", body = AccountResponse),
        (status = 404, description = "Not found"),
        (status = 503, description = "Account store unavailable")
    ),
    tag = "accounts"
)]
pub async fn find_account_by_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<AccountResponse>, StatusCode> {
    let account = state
        .accounts()
        .find_by_email(&query.email)
        .await
        .map_err(error_status)?;
    found(account)
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/accounts", get(find_account_by_email))
        .route("/api/v1/accounts/:id", get(get_account))
        .with_state(state)
}
