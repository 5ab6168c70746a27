use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{openapi::ApiDoc, state::AppState};

pub mod accounts;
pub mod auth;
pub mod health;

/// All API routes plus the swagger UI, with CORS for the configured front-end.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config().values().cors_allowed_origin);
    Router::new()
        .merge(health::routes(state.clone()))
        .merge(auth::signup::routes(state.clone()))
        .merge(accounts::routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(err) => {
            tracing::warn!(origin, error = %err, "invalid CORS_ALLOWED_ORIGIN, cross-origin requests disabled");
            layer
        }
    }
}
