mod app;
mod config;

use app::{app_router, AppState};
use calvary_core::{AuthService, AuthStore, PgStore};
use config::ApiConfig;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 过期重置记录的清理周期
const RESET_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 优先读取 .env（若存在）
    let _ = dotenv();
    init_tracing();

    let config = ApiConfig::from_env()?;
    info!(auth = ?config.auth, "starting API on {}", config.bind);

    let store = PgStore::connect(&config.database).await?;
    store.ensure_reset_table().await?;

    let auth = Arc::new(AuthService::new(store, config.auth.clone()));
    spawn_reset_purge(Arc::clone(&auth));

    let state = AppState { auth };
    let app = app_router(state, config.cors_origins.clone());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// 后台定期清理过期的重置 token
fn spawn_reset_purge<S: AuthStore>(auth: Arc<AuthService<S>>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RESET_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = auth.purge_expired_resets().await {
                tracing::warn!(error = %e, "failed to purge expired reset tokens");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
