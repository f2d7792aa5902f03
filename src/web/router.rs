//! Router configuration for the HTTP API.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

use super::handlers::{
    allow, append_to_index, auth_callback, get_index, list_files, list_folders, upload_project,
    AppState,
};
use super::middleware::create_cors_layer;

/// Create the main API router.
///
/// `max_upload_bytes` bounds request bodies, multipart uploads included.
pub fn create_router(
    app_state: Arc<AppState>,
    cors_origins: &[String],
    max_upload_bytes: usize,
) -> Router {
    // OAuth routes
    let auth_routes = Router::new()
        .route("/allow", get(allow))
        .route("/auth", get(auth_callback));

    // Lesson routes
    let lesson_routes = Router::new()
        .route("/upload", post(upload_project))
        .route("/folders", post(list_folders))
        .route("/files", post(list_files))
        .route("/get_json", post(get_index))
        .route("/edit_json", post(append_to_index));

    Router::new()
        .merge(auth_routes)
        .merge(lesson_routes)
        .layer(
            ServiceBuilder::new()
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Serve files from `static_path` for any unmatched GET.
///
/// Returns `None` if the directory does not exist.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let dir = Path::new(static_path);
    if !dir.is_dir() {
        tracing::warn!("Static directory not found: {}", static_path);
        return None;
    }
    Some(Router::new().fallback_service(ServeDir::new(dir)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_health_router() {
        let _router = create_health_router();
        // Should not panic
    }

    #[test]
    fn test_static_router_missing_dir() {
        assert!(create_static_router("/nonexistent/lessondrop/public").is_none());
    }

    #[test]
    fn test_static_router_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(create_static_router(dir.path().to_str().unwrap()).is_some());
    }
}
