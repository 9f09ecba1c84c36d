mod analysis;
mod app;
mod config;
mod error;
mod images;
mod sheets;
mod state;
mod telegram;
mod webhook;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "nutribot=debug,axum=info,tower_http=info".to_string());
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

    let config = AppConfig::from_env()?;
    tracing::info!(
        analysis = config.gemini.is_some(),
        sheet_log = config.sheets.is_some(),
        echo_text = config.telegram.echo_text,
        "configuration loaded"
    );

    let state = AppState::init(config).await?;
    app::serve(app::build_app(state)).await
}
