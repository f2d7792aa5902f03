//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{Config, StorageBackend};
use crate::error::{LessonDropError, Result};
use crate::lesson::{LessonService, PathLayout};
use crate::oauth::{OAuthClient, OAuthSession, TokenStore};
use crate::storage::{DropboxClient, MemoryStorage, RemoteStorage};

use super::handlers::AppState;
use super::router::{create_health_router, create_router, create_static_router};

/// Web server for the API.
pub struct WebServer {
    /// Address to bind, `host:port`.
    bind: String,
    /// Application state.
    app_state: Arc<AppState>,
    cors_origins: Vec<String>,
    static_path: Option<String>,
    max_upload_bytes: usize,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, app_state: AppState) -> Self {
        let max_upload_bytes = usize::try_from(config.lessons.max_upload_size_mb)
            .unwrap_or(usize::MAX / (1024 * 1024))
            .saturating_mul(1024 * 1024);

        Self {
            bind: format!("{}:{}", config.server.host, config.server.port),
            app_state: Arc::new(app_state),
            cors_origins: config.web.cors_origins.clone(),
            static_path: config
                .web
                .serve_static
                .then(|| config.web.static_path.clone()),
            max_upload_bytes,
        }
    }

    /// Create a web server with the storage backend selected in `config`.
    ///
    /// A refresh token persisted in `dropbox.token_file` is restored, so a
    /// restart does not require authorizing again.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let client = OAuthClient::new(&config.dropbox, config.redirect_uri())?;
        let store = config.dropbox.token_file.as_ref().map(TokenStore::new);
        let session = Arc::new(OAuthSession::new(client, store));

        let storage: Arc<dyn RemoteStorage> = match config.storage.backend {
            StorageBackend::Dropbox => {
                match session.restore().await {
                    Ok(true) => {}
                    Ok(false) => tracing::info!("Not connected to Dropbox yet, visit /allow"),
                    Err(e) => tracing::warn!("Failed to restore Dropbox token: {}", e),
                }
                Arc::new(DropboxClient::new(&config.dropbox, session.clone())?)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, uploads are lost on restart");
                Arc::new(MemoryStorage::new())
            }
        };

        let lessons = LessonService::new(
            storage,
            PathLayout::from_config(&config.lessons),
            config.lessons.index_write_attempts,
        );
        Ok(Self::new(config, AppState::new(lessons, session)))
    }

    /// Configured bind address.
    pub fn bind_address(&self) -> &str {
        &self.bind
    }

    /// Build the complete router.
    pub fn router(&self) -> Router {
        let mut router = create_router(
            self.app_state.clone(),
            &self.cors_origins,
            self.max_upload_bytes,
        )
        .merge(create_health_router());

        if let Some(path) = &self.static_path {
            if let Some(static_router) = create_static_router(path) {
                router = router.merge(static_router);
            }
        }

        // Traced after merging so unmatched requests get a span too
        router.layer(TraceLayer::new_for_http())
    }

    async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(&self.bind).await.map_err(|e| {
            LessonDropError::Config(format!("cannot listen on {}: {}", self.bind, e))
        })
    }

    /// Run the web server.
    pub async fn run(self) -> Result<()> {
        let router = self.router();
        let listener = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let router = self.router();
        let listener = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
