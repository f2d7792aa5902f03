//! OAuth handlers: `/allow` starts the PKCE flow, `/auth` finishes it.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::web::dto::AuthCallbackQuery;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Text returned once the account is connected.
pub const AUTH_SUCCESS_MESSAGE: &str = "Dropbox connected - you can close this window.";

/// GET /allow - redirect the browser to the Dropbox consent page.
pub async fn allow(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let url = state
        .session
        .begin_authorization()
        .await
        .map_err(|e| ApiError::logged_plain("Failed to start auth", e))?;

    tracing::info!("Redirecting to Dropbox consent page");
    Ok((StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response())
}

/// GET /auth - exchange the authorization code for tokens.
pub async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthCallbackQuery>,
) -> Result<&'static str, ApiError> {
    if let Some(error) = &query.error {
        return Err(ApiError::logged_plain(
            "Auth failed",
            format!(
                "authorization denied: {} {}",
                error,
                query.error_description.as_deref().unwrap_or_default()
            ),
        ));
    }
    let (Some(code), Some(oauth_state)) = (&query.code, &query.state) else {
        return Err(ApiError::logged_plain(
            "Auth failed",
            "redirect is missing code or state",
        ));
    };

    state
        .session
        .complete_authorization(code, oauth_state)
        .await
        .map_err(|e| ApiError::logged_plain("Auth failed", e))?;

    Ok(AUTH_SUCCESS_MESSAGE)
}
