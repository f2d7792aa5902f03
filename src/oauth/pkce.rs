//! PKCE (RFC 7636) code verifier and S256 challenge.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Characters allowed in a code verifier.
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Length of generated verifiers (RFC 7636 allows 43..=128).
pub const VERIFIER_LENGTH: usize = 64;

/// Secret kept by the server between the consent redirect and the code exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Generate a random verifier.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let verifier = (0..VERIFIER_LENGTH)
            .map(|_| UNRESERVED[rng.random_range(0..UNRESERVED.len())] as char)
            .collect();
        Self(verifier)
    }

    /// Wrap an existing verifier string.
    pub fn new(verifier: impl Into<String>) -> Self {
        Self(verifier.into())
    }

    /// The verifier sent with the token request.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The S256 challenge sent with the authorization request.
    pub fn challenge(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl std::fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CodeVerifier(..)")
    }
}
