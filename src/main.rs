mod app;
mod auth;
mod catalog;
mod config;
mod dates;
mod entries;
mod nutrition;
mod pantry;
mod settings;
mod state;
mod wizard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "mealtrack=debug,axum=info,tower_http=info".to_string());
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

    let state = state::AppState::init().await?;
    if let Err(e) = sqlx::migrate!("./migrations").run(&state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing with the existing schema");
    }
    tracing::info!(
        max_connections = state.config.db_max_connections,
        submit_timeout = ?state.config.submit_timeout,
        "database ready"
    );

    app::serve(app::build_app(state)).await
}
