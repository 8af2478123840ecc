//! EventDeck Server - hosted accounts and live documents for EventDeck clients.
//!
//! Serves the same contract the client engine expects from its providers:
//! accounts with bearer-token sessions, schema-checked document writes, and
//! live filtered snapshots over WebSocket.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod websocket;

use std::sync::Arc;

use axum::Router;
use eventdeck_engine::{DocumentStore, MemoryDocumentStore, Schema};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{AccountStore, MemoryAccounts};
use crate::config::Config;
use crate::db::{PgAccounts, PgDocumentStore, Pool};
use crate::websocket::ConnectionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<dyn DocumentStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub schema: Arc<Schema>,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
}

impl AppState {
    /// State backed by process memory. Nothing survives a restart.
    pub fn in_memory(config: Config) -> Self {
        Self::with_stores(
            config,
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryAccounts::new()),
        )
    }

    /// State backed by PostgreSQL.
    pub fn postgres(config: Config, pool: Pool) -> Self {
        Self::with_stores(
            config,
            Arc::new(PgDocumentStore::new(pool.clone())),
            Arc::new(PgAccounts::new(pool)),
        )
    }

    pub fn with_stores(
        config: Config,
        documents: Arc<dyn DocumentStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            documents,
            accounts,
            schema: Arc::new(Schema::events()),
            config: Arc::new(config),
            conn_manager: ConnectionManager::new_shared(),
        }
    }

    /// Build state for `config`: PostgreSQL with migrations applied when a
    /// database URL is set, process memory otherwise.
    pub async fn from_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(database_url) = config.database_url.clone() else {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            return Ok(Self::in_memory(config));
        };

        let pool = db::create_pool(&database_url, config.db_max_connections).await?;

        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;

        Ok(Self::postgres(config, pool))
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
