use utoipa::OpenApi;

use crate::{
    handler::{
        accounts::AccountResponse,
        auth::signup::{SignupFieldError, SignupRequest, SignupResult},
        health::Health,
    },
    handler,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handler::health::health,
        handler::auth::signup::signup,
        handler::accounts::get_account,
        handler::accounts::find_account_by_email
    ),
    components(schemas(
        Health,
        SignupRequest,
        SignupResult,
        SignupFieldError,
        AccountResponse
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "auth", description = "Sign-up"),
        (name = "accounts", description = "Account lookup")
    )
)]
pub struct ApiDoc;
