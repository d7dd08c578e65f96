//! ToolBear storefront backend

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolbear::{api, config::Config, db, publisher::EventPublisher, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "toolbear=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::info!(store = ?config.store, "Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("connecting to the database")?;
    sqlx::migrate!("./migrations").run(&pool).await.context("running migrations")?;

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let state = AppState::new(pool, events, config.store.clone());

    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "ToolBear listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}
