//! OAuth session state shared by all handlers.
//!
//! Holds the PKCE verifiers of flows in progress and the current token set.
//! Access tokens are refreshed shortly before they expire. A rotated refresh
//! token replaces the previous one, and the refresh token is written to the
//! token file (when configured) so a restart does not require a new consent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use super::client::{OAuthClient, TokenResponse};
use super::pkce::CodeVerifier;
use crate::error::{LessonDropError, Result};
use crate::storage::{StorageError, StorageResult};

/// Refresh this long before the access token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Pending authorizations older than this are discarded.
const PENDING_TTL_SECS: i64 = 600;

/// Current credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// Bearer token; empty when only a refresh token is known.
    pub access_token: String,
    /// Refresh token, if the flow granted offline access.
    pub refresh_token: Option<String>,
    /// Access token expiry; None means no known expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Connected account.
    pub account_id: Option<String>,
}

impl TokenSet {
    /// Token set built from a token endpoint response.
    ///
    /// Keeps `previous_refresh` when the response does not rotate it.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
            account_id: response.account_id,
        }
    }

    /// Token set restored from a persisted refresh token.
    pub fn from_refresh_token(refresh_token: String, account_id: Option<String>) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: Some(refresh_token),
            expires_at: None,
            account_id,
        }
    }

    /// Whether the access token is missing or about to expire.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty()
            || self
                .expires_at
                .is_some_and(|at| at - Duration::seconds(REFRESH_MARGIN_SECS) <= now)
    }
}

/// On-disk form of the persisted credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredToken {
    /// Refresh token.
    pub refresh_token: String,
    /// Connected account.
    #[serde(default)]
    pub account_id: Option<String>,
    /// When the token was written (RFC 3339).
    pub saved_at: String,
}

/// JSON file holding the refresh token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token, if the file exists.
    pub async fn load(&self) -> Result<Option<StoredToken>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the token, replacing the previous file.
    pub async fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(token)?).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[derive(Debug)]
struct PendingAuthorization {
    verifier: CodeVerifier,
    created_at: DateTime<Utc>,
}

/// OAuth session: flows in progress plus the connected account's tokens.
#[derive(Debug)]
pub struct OAuthSession {
    client: OAuthClient,
    tokens: RwLock<Option<TokenSet>>,
    pending: Mutex<HashMap<String, PendingAuthorization>>,
    store: Option<TokenStore>,
}

impl OAuthSession {
    /// Create a disconnected session.
    pub fn new(client: OAuthClient, store: Option<TokenStore>) -> Self {
        Self {
            client,
            tokens: RwLock::new(None),
            pending: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Load a persisted refresh token. Returns true if one was found.
    pub async fn restore(&self) -> Result<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        match store.load().await? {
            Some(stored) => {
                tracing::info!(path = %store.path().display(), "Restored Dropbox refresh token");
                *self.tokens.write().await = Some(TokenSet::from_refresh_token(
                    stored.refresh_token,
                    stored.account_id,
                ));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Start a PKCE flow and return the consent page URL.
    pub async fn begin_authorization(&self) -> Result<Url> {
        let verifier = CodeVerifier::generate();
        let state = uuid::Uuid::new_v4().simple().to_string();
        let url = self.client.authorization_url(&verifier, &state)?;

        let now = Utc::now();
        let mut pending = self.pending.lock().await;
        pending.retain(|_, p| now - p.created_at < Duration::seconds(PENDING_TTL_SECS));
        pending.insert(
            state,
            PendingAuthorization {
                verifier,
                created_at: now,
            },
        );
        Ok(url)
    }

    /// Finish a PKCE flow: exchange `code` using the verifier stored for `state`.
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<()> {
        let pending = {
            let now = Utc::now();
            let mut pending = self.pending.lock().await;
            pending.retain(|_, p| now - p.created_at < Duration::seconds(PENDING_TTL_SECS));
            pending.remove(state)
        }
        .ok_or_else(|| LessonDropError::Auth("unknown or expired authorization state".to_string()))?;

        let response = self.client.exchange_code(code, &pending.verifier).await?;
        if response.refresh_token.is_none() {
            tracing::warn!("Token response carried no refresh token; access will expire");
        }
        self.install(TokenSet::from_response(response, None, Utc::now()))
            .await
    }

    /// Replace the current tokens and persist the refresh token.
    pub async fn install(&self, tokens: TokenSet) -> Result<()> {
        self.persist(&tokens).await?;
        tracing::info!(account = ?tokens.account_id, "Dropbox account connected");
        *self.tokens.write().await = Some(tokens);
        Ok(())
    }

    /// Whether an account is connected.
    pub async fn is_connected(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    /// Current access token, refreshed if it is missing or about to expire.
    pub async fn access_token(&self) -> StorageResult<String> {
        {
            let tokens = self.tokens.read().await;
            match tokens.as_ref() {
                None => return Err(StorageError::NotConnected),
                Some(t) if !t.needs_refresh(Utc::now()) => return Ok(t.access_token.clone()),
                Some(_) => {}
            }
        }

        let mut tokens = self.tokens.write().await;
        let current = tokens.as_ref().ok_or(StorageError::NotConnected)?;
        // Another request may have refreshed while we waited for the lock
        if !current.needs_refresh(Utc::now()) {
            return Ok(current.access_token.clone());
        }
        let Some(refresh_token) = current.refresh_token.clone() else {
            if current.access_token.is_empty() {
                return Err(StorageError::NotConnected);
            }
            return Ok(current.access_token.clone());
        };

        let response = self.client.refresh(&refresh_token).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to refresh Dropbox access token");
            StorageError::Unauthorized(e.to_string())
        })?;
        let mut refreshed = TokenSet::from_response(response, Some(refresh_token.clone()), Utc::now());
        if refreshed.account_id.is_none() {
            refreshed.account_id = current.account_id.clone();
        }
        if refreshed.refresh_token.as_deref() != Some(refresh_token.as_str()) {
            tracing::info!("Dropbox refresh token rotated");
            if let Err(e) = self.persist(&refreshed).await {
                tracing::warn!(error = %e, "Failed to persist rotated refresh token");
            }
        }
        let access_token = refreshed.access_token.clone();
        *tokens = Some(refreshed);
        Ok(access_token)
    }

    async fn persist(&self, tokens: &TokenSet) -> Result<()> {
        let (Some(store), Some(refresh_token)) = (&self.store, &tokens.refresh_token) else {
            return Ok(());
        };
        store
            .save(&StoredToken {
                refresh_token: refresh_token.clone(),
                account_id: tokens.account_id.clone(),
                saved_at: Utc::now().to_rfc3339(),
            })
            .await
    }
}
