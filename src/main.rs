use std::{io::IsTerminal, sync::Arc};

use signup_api::{
    config::LogFormat,
    handler,
    service::config::{ConfigService, ConfigServiceImpl},
    state::AppState,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() {
    let config = Arc::new(ConfigServiceImpl::new());
    init_logging(config.values().log_format);

    let port = config.port();
    let state = AppState::new(config)
        .await
        .expect("account store connection failed");
    let app = handler::router(state);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|_| panic!("failed to bind to {}", bind_addr));
    tracing::info!(addr = %bind_addr, "listening");

    axum::serve(listener, app)
        .await
        .expect("server error");
}
