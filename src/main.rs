use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod routes;
mod state;
mod templates;

mod crypto {
    pub mod csrf;
    pub mod session_id;
}

mod models {
    pub mod session;
}

mod repositories {
    pub mod memory_session;
    pub mod postgres_session;
    pub mod session;
}

mod rest {
    pub mod auth;
    pub mod channels;
    pub mod client;
    pub mod comments;
    pub mod entities;
    pub mod feed;
    pub mod posts;
    pub mod search;
    pub mod users;
}

mod services {
    pub mod auth;
    pub mod csrf;
    pub mod session;
}

mod handlers {
    pub mod account;
    pub mod channels;
    pub mod common;
    pub mod front;
    pub mod home;
    pub mod posts;
    pub mod search;
}

mod middleware_layer {
    pub mod session;
}

mod validation {
    pub mod forms;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize state: {e}"))?;
    tracing::info!("✅ AppState initialized");

    let app = routes::build_router(state.clone());

    let sweep_state = state.clone();
    let sweep_interval = config.session_sweep_interval;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            tracing::info!("🧹 Sweeping expired sessions...");
            match sweep_state.sessions.sweep_expired().await {
                Ok(removed) => {
                    tracing::info!("✅ Session sweep removed {} sessions", removed);
                }
                Err(e) => {
                    tracing::error!("❌ Session sweep failed: {}", e);
                }
            }
        }
    });

    let addr = config.bind_addr;
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!(
        "✅ Background session sweep started (every {}s)",
        sweep_interval.as_secs()
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
