//! OAuth2 authorization-code + PKCE flow against Dropbox.

mod client;
pub mod pkce;
mod session;

pub use client::{OAuthClient, TokenResponse};
pub use pkce::CodeVerifier;
pub use session::{OAuthSession, StoredToken, TokenSet, TokenStore};
