// bridge-server/src/firebase.rs
//! Firebase ID token verification against Google's published keys.

use async_trait::async_trait;
use common::unix_now;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const MAX_UID_LEN: usize = 128;

/// Outcome of a failed verification.
///
/// Callers must keep the two apart: an unreachable key endpoint is our
/// problem, not the caller's token.
#[derive(Debug, Clone, Error)]
pub enum VerifyError {
    #[error("{0}")]
    InvalidAssertion(String),
    #[error("{0}")]
    InfrastructureUnavailable(String),
}

/// Verified claims of a Firebase ID token
#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseClaims {
    /// The Firebase uid
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub auth_time: Option<i64>,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<FirebaseClaims, VerifyError>;
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

type KeySet = HashMap<String, DecodingKey>;

/// Verifies ID tokens issued for one Firebase project
pub struct FirebaseVerifier {
    project_id: String,
    issuer: String,
    jwks_url: String,
    http: reqwest::Client,
    keys: Cache<String, Arc<KeySet>>,
    timeout: Duration,
}

impl FirebaseVerifier {
    pub fn new(
        project_id: impl Into<String>,
        jwks_url: impl Into<String>,
        http: reqwest::Client,
        cache_ttl: Duration,
        timeout: Duration,
    ) -> Self {
        let project_id = project_id.into();
        Self {
            issuer: format!("{}{}", ISSUER_PREFIX, project_id),
            project_id,
            jwks_url: jwks_url.into(),
            http,
            keys: Cache::builder().time_to_live(cache_ttl).max_capacity(1).build(),
            timeout,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Current signing keys; concurrent misses share one fetch
    async fn signing_keys(&self) -> Result<Arc<KeySet>, VerifyError> {
        self.keys
            .try_get_with(self.jwks_url.clone(), self.fetch_keys())
            .await
            .map_err(|e| (*e).clone())
    }

    async fn fetch_keys(&self) -> Result<Arc<KeySet>, VerifyError> {
        tracing::debug!(url = %self.jwks_url, "Fetching Firebase public keys");
        let unavailable = |e: reqwest::Error| {
            VerifyError::InfrastructureUnavailable(format!("failed to fetch Firebase public keys: {}", e))
        };

        let jwks: JwksResponse = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)?;

        let mut keys = KeySet::new();
        for jwk in jwks.keys {
            let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
                continue;
            };
            if jwk.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(err) => tracing::warn!(kid = %kid, "Skipping unusable Firebase public key: {}", err),
            }
        }

        if keys.is_empty() {
            return Err(VerifyError::InfrastructureUnavailable(
                "Firebase public key set contains no usable RSA keys".to_string(),
            ));
        }
        Ok(Arc::new(keys))
    }

    async fn verify_inner(&self, id_token: &str) -> Result<FirebaseClaims, VerifyError> {
        let header = decode_header(id_token)
            .map_err(|e| VerifyError::InvalidAssertion(format!("Decoding Firebase ID token failed: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::InvalidAssertion(format!(
                "Firebase ID token has incorrect algorithm. Expected RS256 but got {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::InvalidAssertion("Firebase ID token has no \"kid\" claim".to_string()))?;

        let keys = self.signing_keys().await?;
        let key = keys.get(&kid).ok_or_else(|| {
            VerifyError::InvalidAssertion(
                "Firebase ID token has \"kid\" claim which does not correspond to a known public key".to_string(),
            )
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
        validation.leeway = 0;

        let claims = decode::<FirebaseClaims>(id_token, key, &validation)
            .map_err(|e| VerifyError::InvalidAssertion(describe_jwt_error(&e, &self.project_id, &self.issuer)))?
            .claims;

        let now = unix_now();
        if claims.iat > now {
            return Err(VerifyError::InvalidAssertion(
                "Firebase ID token has \"iat\" claim in the future".to_string(),
            ));
        }
        if claims.auth_time.is_some_and(|auth_time| auth_time > now) {
            return Err(VerifyError::InvalidAssertion(
                "Firebase ID token has \"auth_time\" claim in the future".to_string(),
            ));
        }
        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(VerifyError::InvalidAssertion(format!(
                "Firebase ID token has \"sub\" claim that is empty or longer than {} characters",
                MAX_UID_LEN
            )));
        }

        Ok(claims)
    }
}

fn describe_jwt_error(err: &jsonwebtoken::errors::Error, project_id: &str, issuer: &str) -> String {
    match err.kind() {
        ErrorKind::ExpiredSignature => "Firebase ID token has expired".to_string(),
        ErrorKind::ImmatureSignature => "Firebase ID token is not yet valid".to_string(),
        ErrorKind::InvalidSignature => "Firebase ID token has invalid signature".to_string(),
        ErrorKind::InvalidAudience => format!(
            "Firebase ID token has incorrect \"aud\" (audience) claim. Expected \"{}\"",
            project_id
        ),
        ErrorKind::InvalidIssuer => format!(
            "Firebase ID token has incorrect \"iss\" (issuer) claim. Expected \"{}\"",
            issuer
        ),
        ErrorKind::MissingRequiredClaim(claim) => format!("Firebase ID token is missing the \"{}\" claim", claim),
        _ => format!("Decoding Firebase ID token failed: {}", err),
    }
}

#[async_trait]
impl IdTokenVerifier for FirebaseVerifier {
    async fn verify(&self, id_token: &str) -> Result<FirebaseClaims, VerifyError> {
        match tokio::time::timeout(self.timeout, self.verify_inner(id_token)).await {
            Ok(result) => result,
            Err(_) => Err(VerifyError::InfrastructureUnavailable(format!(
                "timed out after {}s verifying Firebase ID token",
                self.timeout.as_secs()
            ))),
        }
    }
}
