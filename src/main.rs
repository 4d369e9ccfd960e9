mod app;
mod auth;
mod config;
mod db;
mod error;
mod games;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "gamehub=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;
    log_startup(&app_state);

    let (host, port) = (app_state.config.host.clone(), app_state.config.port);
    app::serve(app::build_app(app_state), &host, port).await
}

fn log_startup(state: &AppState) {
    let cfg = &state.config;
    tracing::info!(
        environment = ?cfg.environment,
        rawg_api_key = if state.games.has_api_key() { "set (hidden)" } else { "not set" },
        rawg_base_url = %cfg.rawg.base_url,
        jwt_secret = "set (hidden)",
        jwt_ttl_minutes = cfg.jwt.ttl_minutes,
        db_max_connections = cfg.database_max_connections,
        cors_origins = ?cfg.cors_origins,
        "startup checks"
    );
    if !state.games.has_api_key() {
        tracing::warn!("RAWG_API_KEY is not set; /api/games will answer 500 until it is configured");
    }
}
