//! History server: REST, WebSocket fan-out and the viewer dashboard
//!
//! ```rust,no_run
//! use element_inspector::server::{self, ServerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> element_inspector::Result<()> {
//! let shutdown = CancellationToken::new();
//! server::serve(ServerConfig::default().port(4000), shutdown).await?;
//! # Ok(())
//! # }
//! ```

pub mod routes;
pub mod schema;
pub mod store;

pub use routes::router;
pub use store::{HistoryStore, SqliteHistoryStore};

use crate::error::Result;
use crate::payload::ServerMessage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Largest page a history request may ask for
pub const MAX_HISTORY_LIMIT: usize = 100;

const BROADCAST_CAPACITY: usize = 64;

/// Configuration for the history server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// SQLite database file
    pub database: PathBuf,

    /// Rows sent to viewers and returned when no limit is given
    pub history_limit: usize,

    /// Rows kept in the database; `None` keeps everything
    pub retention: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database: PathBuf::from("element_history.db"),
            history_limit: 10,
            retention: Some(1000),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the bind host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Builder method: set the bind port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method: set the database file
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = path.into();
        self
    }

    /// Builder method: set the retention limit
    pub fn retention(mut self, retention: Option<usize>) -> Self {
        self.retention = retention;
        self
    }
}

/// Shared state of all handlers
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn HistoryStore>,
    updates: broadcast::Sender<ServerMessage>,
    history_limit: usize,
    connections: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(store: Arc<dyn HistoryStore>, history_limit: usize) -> Self {
        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            store,
            updates,
            history_limit: history_limit.clamp(1, MAX_HISTORY_LIMIT),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Builder method: close WebSocket connections when `token` is cancelled
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Open WebSocket connections
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.updates.subscribe()
    }

    /// The current history as a wire message; store failures become an error message
    pub async fn history_message(&self) -> ServerMessage {
        match self.store.recent(self.history_limit).await {
            Ok(records) => ServerMessage::History(records),
            Err(e) => {
                log::error!("Failed to load history: {}", e);
                ServerMessage::Error(format!("Failed to load history: {}", e))
            }
        }
    }

    /// Send the refreshed history to every connection
    pub async fn broadcast_history(&self) {
        let message = self.history_message().await;
        // No receivers simply means nobody is watching
        let receivers = self.updates.send(message).unwrap_or(0);
        log::debug!("Broadcast history to {} connections", receivers);
    }

    fn connection_opened(&self) -> usize {
        self.connections.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn connection_closed(&self) -> usize {
        self.connections.fetch_sub(1, Ordering::SeqCst) - 1
    }
}

/// Open the database from `config` and serve until `shutdown` is cancelled
pub async fn serve(config: ServerConfig, shutdown: CancellationToken) -> Result<()> {
    let store = SqliteHistoryStore::open(&config.database)
        .await?
        .with_retention(config.retention);
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let state = AppState::new(Arc::new(store), config.history_limit).with_shutdown(shutdown.clone());

    serve_with_listener(listener, state, shutdown).await
}

/// Serve on an already bound listener
pub async fn serve_with_listener(listener: TcpListener, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let addr = listener.local_addr()?;
    log::info!("History server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    log::info!("History server on {} stopped", addr);
    Ok(())
}
