// bridge-server/src/google/access_token.rs
use super::credentials::{CredentialsError, GoogleCredentials, ServiceAccountKey};
use common::unix_now;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// OAuth scope for Firestore reads
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

// Tokens are refreshed this long before Google says they expire
const EXPIRY_MARGIN_SECS: i64 = 60;
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: i64,
}

/// Hands out OAuth access tokens for the configured Google credentials.
///
/// The cache lock is held across the refresh, so concurrent callers wait for
/// one token request instead of each issuing their own.
#[derive(Debug)]
pub struct AccessTokenProvider {
    credentials: GoogleCredentials,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenProvider {
    pub fn new(credentials: GoogleCredentials, http: reqwest::Client) -> Self {
        Self {
            credentials,
            http,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, CredentialsError> {
        let mut cached = self.cached.lock().await;
        let now = unix_now();
        if let Some(token) = cached.as_ref().filter(|token| token.refresh_at > now) {
            return Ok(token.value.clone());
        }

        let response = self.request_token().await?;
        tracing::debug!("Fetched Google access token, expires in {}s", response.expires_in);
        let token = CachedToken {
            value: response.access_token,
            refresh_at: now + response.expires_in - EXPIRY_MARGIN_SECS,
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<TokenResponse, CredentialsError> {
        let request = match &self.credentials {
            GoogleCredentials::ServiceAccount(key) => {
                let assertion = sign_assertion(key, unix_now())?;
                self.http.post(&key.token_uri).form(&[
                    ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                    ("assertion", assertion.as_str()),
                ])
            }
            GoogleCredentials::AuthorizedUser(user) => self.http.post(&user.token_uri).form(&[
                ("grant_type", "refresh_token"),
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("refresh_token", user.refresh_token.as_str()),
            ]),
            GoogleCredentials::Metadata { host } => self
                .http
                .get(format!(
                    "http://{}/computeMetadata/v1/instance/service-accounts/default/token",
                    host
                ))
                .header("Metadata-Flavor", "Google"),
        };

        let response = request
            .send()
            .await
            .map_err(|e| CredentialsError::TokenRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialsError::TokenRequest(format!("{}: {}", status, body)));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| CredentialsError::TokenRequest(e.to_string()))
    }
}

/// Self-signed JWT exchanged for an access token (RFC 7523 bearer grant)
fn sign_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, CredentialsError> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: DATASTORE_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key =
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(CredentialsError::InvalidPrivateKey)?;
    encode(&header, &claims, &encoding_key).map_err(CredentialsError::InvalidPrivateKey)
}
