//! Dropbox OAuth2 endpoints: consent URL, code exchange and token refresh.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::pkce::CodeVerifier;
use crate::config::DropboxConfig;
use crate::error::{LessonDropError, Result};

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Short-lived bearer token.
    pub access_token: String,
    /// Token type ("bearer").
    #[serde(default)]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Long-lived refresh token (only with `token_access_type=offline`).
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Connected account.
    #[serde(default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// HTTP client for the Dropbox OAuth2 endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    client_id: String,
    authorize_url: String,
    token_url: String,
    redirect_uri: String,
    scope: Option<String>,
}

impl OAuthClient {
    /// Create a client for the given app and redirect URI.
    pub fn new(config: &DropboxConfig, redirect_uri: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .build()
            .map_err(|e| LessonDropError::Auth(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            authorize_url: config.authorize_url.clone(),
            token_url: format!("{}/oauth2/token", config.api_url.trim_end_matches('/')),
            redirect_uri: redirect_uri.into(),
            scope: config.scope.clone(),
        })
    }

    /// Redirect URI registered with the app.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Build the consent page URL for an authorization-code + PKCE flow.
    pub fn authorization_url(&self, verifier: &CodeVerifier, state: &str) -> Result<Url> {
        let mut url = Url::parse(&self.authorize_url)
            .map_err(|e| LessonDropError::Config(format!("invalid authorize_url: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("token_access_type", "offline")
                .append_pair("code_challenge", &verifier.challenge())
                .append_pair("code_challenge_method", "S256")
                .append_pair("state", state);
            if let Some(scope) = &self.scope {
                query.append_pair("scope", scope);
            }
        }
        Ok(url)
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str, verifier: &CodeVerifier) -> Result<TokenResponse> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
            ("code_verifier", verifier.as_str()),
        ])
        .await
    }

    /// Obtain a new access token from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| LessonDropError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TokenErrorBody>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(LessonDropError::Auth(format!(
                "token endpoint returned {status}: {reason}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| LessonDropError::Auth(format!("invalid token response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(scope: Option<&str>) -> OAuthClient {
        let config = DropboxConfig {
            client_id: "app-key".to_string(),
            scope: scope.map(str::to_string),
            ..DropboxConfig::default()
        };
        OAuthClient::new(&config, "http://localhost:3000/auth").unwrap()
    }

    #[test]
    fn test_token_url_from_api_url() {
        let config = DropboxConfig {
            api_url: "http://127.0.0.1:9000/".to_string(),
            ..DropboxConfig::default()
        };
        let client = OAuthClient::new(&config, "http://localhost:3000/auth").unwrap();
        assert_eq!(client.token_url, "http://127.0.0.1:9000/oauth2/token");
        assert_eq!(client.redirect_uri(), "http://localhost:3000/auth");
    }

    #[test]
    fn test_authorization_url_parameters() {
        let client = test_client(None);
        let verifier = CodeVerifier::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        let url = client.authorization_url(&verifier, "state-1").unwrap();

        assert_eq!(url.host_str(), Some("www.dropbox.com"));
        assert_eq!(url.path(), "/oauth2/authorize");

        let params: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "app-key");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["redirect_uri"], "http://localhost:3000/auth");
        assert_eq!(params["token_access_type"], "offline");
        assert_eq!(
            params["code_challenge"],
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["state"], "state-1");
        assert!(!params.contains_key("scope"));
    }

    #[test]
    fn test_authorization_url_with_scope() {
        let client = test_client(Some("files.content.write sharing.write"));
        let url = client
            .authorization_url(&CodeVerifier::generate(), "s")
            .unwrap();
        let scope = url
            .query_pairs()
            .find(|(k, _)| k == "scope")
            .map(|(_, v)| v.into_owned());
        assert_eq!(scope.as_deref(), Some("files.content.write sharing.write"));
    }

    #[test]
    fn test_authorization_url_invalid_base() {
        let config = DropboxConfig {
            authorize_url: "not a url".to_string(),
            ..DropboxConfig::default()
        };
        let client = OAuthClient::new(&config, "http://localhost:3000/auth").unwrap();
        let result = client.authorization_url(&CodeVerifier::generate(), "s");
        assert!(matches!(result, Err(LessonDropError::Config(_))));
    }
}
