use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::repositories::memory_session::MemorySessionStore;
use crate::repositories::postgres_session::PostgresSessionStore;
use crate::repositories::session::SessionStore;
use crate::rest::client::RestClient;
use crate::services::session::SessionManager;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// The session manager.
    pub sessions: SessionManager,
    /// The issue#1 REST client.
    pub rest: RestClient,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn SessionStore> = match config.database_url {
            Some(ref url) => {
                let pool = crate::db::create_pool(url)?;
                crate::db::run_migrations(&pool).await?;
                tracing::info!("✅ PostgreSQL session store initialized with deadpool-postgres");
                Arc::new(PostgresSessionStore::new(pool))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL not set, sessions are kept in memory");
                Arc::new(MemorySessionStore::new())
            }
        };

        let rest = RestClient::new(&config.rest_base_url, config.rest_timeout)?;
        tracing::info!("✅ REST client initialized for {}", rest.base_url());

        Ok(Self::with_store(config, store, rest))
    }

    /// Creates an `AppState` around an existing store and client.
    pub fn with_store(config: &Config, store: Arc<dyn SessionStore>, rest: RestClient) -> Self {
        AppState {
            sessions: SessionManager::new(store, config.session_idle_lifetime),
            config: Arc::new(config.clone()),
            rest,
        }
    }
}

impl From<deadpool_postgres::CreatePoolError> for AppError {
    fn from(e: deadpool_postgres::CreatePoolError) -> Self {
        AppError::Internal(format!("Pool creation failed: {e}"))
    }
}
