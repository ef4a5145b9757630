// bridge-server/src/state.rs
use crate::bridge::TokenBridge;
use crate::directory::{DirectoryStore, FirestoreDirectory};
use crate::firebase::{FirebaseVerifier, IdTokenVerifier};
use crate::google::{self, AccessTokenProvider, CredentialsError};
use crate::resolver::UserIdResolver;
use common::BridgeConfig;
use std::sync::Arc;
use thiserror::Error;

/// Reasons the service refuses to start
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Missing SUPABASE_JWT_SECRET. Add it to the environment or .env")]
    MissingSigningSecret,

    #[error("Firebase Admin credentials unavailable: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid FIRESTORE_BASE_URL: {0}")]
    FirestoreUrl(#[from] url::ParseError),
}

/// Shared, read-only handles used by every request
pub struct AppState {
    pub bridge: TokenBridge,
    pub resolver: UserIdResolver,
}

impl AppState {
    pub fn new(bridge: TokenBridge, resolver: UserIdResolver) -> Self {
        Self { bridge, resolver }
    }

    /// Validate configuration and build the Google-facing clients.
    ///
    /// Runs once, before the server accepts connections.
    pub async fn initialize(config: &BridgeConfig) -> Result<Self, StartupError> {
        let secret = config.signing_secret().ok_or(StartupError::MissingSigningSecret)?;

        let http = reqwest::Client::builder()
            .timeout(config.verify_timeout())
            .build()?;

        let discovered = google::discover(config, &http).await?;
        tracing::info!(
            "Using Google credentials from {} for project {}",
            discovered.source,
            discovered.project_id
        );

        let verifier = FirebaseVerifier::new(
            discovered.project_id.clone(),
            config.firebase_jwks_url.clone(),
            http.clone(),
            config.jwks_cache_ttl(),
            config.verify_timeout(),
        );
        let verifier: Arc<dyn IdTokenVerifier> = Arc::new(verifier);

        let tokens = Arc::new(AccessTokenProvider::new(discovered.credentials, http.clone()));
        let directory: Arc<dyn DirectoryStore> = Arc::new(FirestoreDirectory::new(
            &config.firestore_base_url,
            discovered.project_id,
            config.firestore_database.clone(),
            tokens,
            http,
        )?);

        match config.expected_audience() {
            Some(aud) => tracing::info!("Inbound tokens must carry audience {}", aud),
            None => tracing::warn!("FIREBASE_PROJECT_ID not set; skipping the audience check"),
        }

        let bridge = TokenBridge::new(
            verifier,
            secret,
            config.supabase_jwt_expires_in_seconds,
            config.expected_audience().map(str::to_string),
        );
        tracing::info!("Supabase JWT lifetime {}s", bridge.lifetime_secs());

        Ok(Self::new(bridge, UserIdResolver::new(directory)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_secret_fails_before_credential_discovery() {
        // Both credential forms set: discovery would fail with Ambiguous
        let config = BridgeConfig {
            firebase_service_account_json: Some("{}".into()),
            firebase_service_account_path: Some("/tmp/sa.json".into()),
            ..Default::default()
        };
        let err = AppState::initialize(&config).await.err().unwrap();
        assert!(matches!(err, StartupError::MissingSigningSecret));
    }

    #[tokio::test]
    async fn test_blank_secret_counts_as_missing() {
        let config = BridgeConfig {
            supabase_jwt_secret: Some(String::new()),
            ..Default::default()
        };
        let err = AppState::initialize(&config).await.err().unwrap();
        assert!(matches!(err, StartupError::MissingSigningSecret));
    }

    #[tokio::test]
    async fn test_unestablished_credentials_fail_startup() {
        let config = BridgeConfig {
            supabase_jwt_secret: Some("secret".into()),
            gce_metadata_host: Some("127.0.0.1:9".into()),
            ..Default::default()
        };
        let err = AppState::initialize(&config).await.err().unwrap();
        assert!(matches!(err, StartupError::Credentials(CredentialsError::NotFound)));
    }
}
