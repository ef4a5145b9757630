// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use config::{Config as ConfigFile, File, Environment};

/// Google's published signing keys for Firebase ID tokens, in JWK form.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Central configuration for the token bridge.
///
/// Field names double as the environment variable names (upper-cased), so
/// `SUPABASE_JWT_SECRET` populates `supabase_jwt_secret`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,

    /// HS256 secret shared with Supabase. Required at startup.
    pub supabase_jwt_secret: Option<String>,
    pub supabase_jwt_expires_in_seconds: u64,

    /// Expected `aud` of inbound Firebase tokens. Unset disables the check.
    pub firebase_project_id: Option<String>,

    // Credential material, at most one of the two explicit forms
    pub firebase_service_account_json: Option<String>,
    pub firebase_service_account_path: Option<PathBuf>,

    // Ambient discovery inputs
    pub google_application_credentials: Option<PathBuf>,
    pub google_cloud_project: Option<String>,
    pub gcloud_project: Option<String>,
    pub cloudsdk_config: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub gce_metadata_host: Option<String>,

    pub firebase_jwks_url: String,
    pub jwks_cache_ttl_seconds: u64,
    pub firestore_base_url: String,
    pub firestore_database: String,
    pub verify_timeout_seconds: u64,
    pub resolve_rate_limit_per_minute: usize,
    /// Key the rate limit on `X-Forwarded-For`; only behind a proxy that sets it
    pub trust_forwarded_for: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            supabase_jwt_secret: None,
            supabase_jwt_expires_in_seconds: 3600,
            firebase_project_id: None,
            firebase_service_account_json: None,
            firebase_service_account_path: None,
            google_application_credentials: None,
            google_cloud_project: None,
            gcloud_project: None,
            cloudsdk_config: None,
            home: None,
            gce_metadata_host: None,
            firebase_jwks_url: FIREBASE_JWKS_URL.to_string(),
            jwks_cache_ttl_seconds: 3600,
            firestore_base_url: FIRESTORE_BASE_URL.to_string(),
            firestore_database: "(default)".to_string(),
            verify_timeout_seconds: 5,
            resolve_rate_limit_per_minute: 30,
            trust_forwarded_for: false,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Plain variable names, as in a `.env` file. Values stay strings
            // until deserialized so numeric secrets keep their exact text.
            .add_source(Environment::default())
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The signing secret, treating an empty value as unset.
    pub fn signing_secret(&self) -> Option<&str> {
        self.supabase_jwt_secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
    }

    pub fn expected_audience(&self) -> Option<&str> {
        self.firebase_project_id
            .as_deref()
            .filter(|aud| !aud.trim().is_empty())
    }

    /// Project id override, as honored by the Google client libraries.
    pub fn project_override(&self) -> Option<&str> {
        self.google_cloud_project
            .as_deref()
            .or(self.gcloud_project.as_deref())
            .filter(|project| !project.trim().is_empty())
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_seconds)
    }

    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_seconds)
    }
}
