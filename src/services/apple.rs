use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

const APPLE_KEYS_URL: &str = "https://appleid.apple.com/auth/keys";
const APPLE_ISSUER: &str = "https://appleid.apple.com";

#[derive(Debug, Error)]
pub enum AppleError {
    #[error("APPLE_CLIENT_ID is not configured")]
    NotConfigured,
    #[error("failed to fetch Apple public keys: {0}")]
    Keys(#[from] reqwest::Error),
    #[error("no Apple public key matches the token key id")]
    UnknownKeyId,
    #[error("identity token verification failed: {0}")]
    Verification(#[from] jsonwebtoken::errors::Error),
}

/// Claims extracted from a verified Apple identity token.
#[derive(Debug, Deserialize)]
pub struct AppleIdentity {
    pub sub: String,
    pub email: Option<String>,
}

/// Verifies Apple identity tokens against Apple's published JWK set.
///
/// Keys are fetched lazily and cached in-process; a key-id miss (Apple
/// rotates keys) refreshes the cache once before giving up.
pub struct AppleVerifier {
    client: reqwest::Client,
    audience: Option<String>,
    keys: RwLock<Option<JwkSet>>,
}

impl AppleVerifier {
    pub fn new(audience: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            audience,
            keys: RwLock::new(None),
        }
    }

    /// Verify an identity token (RS256, Apple issuer, configured audience)
    /// and return its subject and email claims.
    pub async fn verify(&self, identity_token: &str) -> Result<AppleIdentity, AppleError> {
        let audience = self.audience.as_ref().ok_or(AppleError::NotConfigured)?;

        let header = decode_header(identity_token)?;
        let kid = header.kid.ok_or(AppleError::UnknownKeyId)?;

        let jwk = match self.cached_key(&kid).await {
            Some(jwk) => jwk,
            None => {
                self.refresh_keys().await?;
                self.cached_key(&kid).await.ok_or(AppleError::UnknownKeyId)?
            }
        };

        let key = DecodingKey::from_jwk(&jwk)?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[APPLE_ISSUER]);

        let data = decode::<AppleIdentity>(identity_token, &key, &validation)?;
        Ok(data.claims)
    }

    async fn cached_key(&self, kid: &str) -> Option<Jwk> {
        self.keys
            .read()
            .await
            .as_ref()
            .and_then(|set| set.find(kid))
            .cloned()
    }

    async fn refresh_keys(&self) -> Result<(), AppleError> {
        let set: JwkSet = self
            .client
            .get(APPLE_KEYS_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        *self.keys.write().await = Some(set);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_audience_is_an_error() {
        let verifier = AppleVerifier::new(None);
        assert!(matches!(
            verifier.verify("anything").await,
            Err(AppleError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn malformed_tokens_fail_before_any_key_fetch() {
        let verifier = AppleVerifier::new(Some("com.example.app".to_string()));
        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(AppleError::Verification(_))
        ));
    }
}
