//! Test helpers for integration tests.
//!
//! Builds the router over in-memory storage, or over a Dropbox client
//! pointed at a mock server.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;

use lessondrop::config::DropboxConfig;
use lessondrop::lesson::{LessonService, PathLayout};
use lessondrop::oauth::{OAuthClient, OAuthSession, TokenSet};
use lessondrop::storage::{MemoryStorage, RemoteStorage};
use lessondrop::web::{create_router, AppState};

/// Body limit used by test routers.
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

/// Redirect URI registered for the test app.
pub const REDIRECT_URI: &str = "http://localhost:3000/auth";

/// Dropbox configuration with every endpoint on `base_url`.
pub fn dropbox_config(base_url: &str) -> DropboxConfig {
    DropboxConfig {
        client_id: "test-app-key".to_string(),
        authorize_url: format!("{}/oauth2/authorize", base_url),
        api_url: base_url.to_string(),
        content_url: base_url.to_string(),
        ..DropboxConfig::default()
    }
}

/// Disconnected OAuth session for `config`.
pub fn create_session(config: &DropboxConfig) -> Arc<OAuthSession> {
    let client = OAuthClient::new(config, REDIRECT_URI).expect("Failed to create OAuth client");
    Arc::new(OAuthSession::new(client, None))
}

/// OAuth session already holding a non-expiring access token.
pub async fn connected_session(config: &DropboxConfig, access_token: &str) -> Arc<OAuthSession> {
    let session = create_session(config);
    session
        .install(TokenSet {
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: None,
            account_id: Some("dbid:test".to_string()),
        })
        .await
        .expect("Failed to install tokens");
    session
}

/// Test server over arbitrary storage.
pub fn create_test_server_with(
    storage: Arc<dyn RemoteStorage>,
    session: Arc<OAuthSession>,
) -> TestServer {
    let lessons = LessonService::new(storage, PathLayout::default(), 3);
    let app_state = Arc::new(AppState::new(lessons, session));
    let router = create_router(app_state, &[], MAX_UPLOAD_BYTES);
    TestServer::new(router).expect("Failed to create test server")
}

/// Test server over fresh in-memory storage.
pub fn create_test_server() -> (TestServer, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let session = create_session(&dropbox_config("https://api.dropboxapi.test"));
    let server = create_test_server_with(storage.clone(), session);
    (server, storage)
}

/// Multipart body as sent by the lesson editor.
pub fn project_form(lesson: &str, name: &str, contents: &'static [u8]) -> MultipartForm {
    MultipartForm::new()
        .add_text("lesson", lesson)
        .add_text("name", name)
        .add_text("title", format!("{} title", name))
        .add_text("description", format!("{} description", name))
        .add_part(
            "projectFile",
            Part::bytes(contents)
                .file_name(format!("{}.sb3", name))
                .mime_type("application/octet-stream"),
        )
}
