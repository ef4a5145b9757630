// bridge-server/src/google/credentials.rs
//! Discovery of Google credential material.
//!
//! Explicit configuration wins (`FIREBASE_SERVICE_ACCOUNT_JSON` or
//! `FIREBASE_SERVICE_ACCOUNT_PATH`, never both), then the application default
//! credential chain: `GOOGLE_APPLICATION_CREDENTIALS`, the gcloud well-known
//! file, and finally the GCE metadata server.

use common::BridgeConfig;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("FIREBASE_SERVICE_ACCOUNT_JSON and FIREBASE_SERVICE_ACCOUNT_PATH are both set; provide exactly one")]
    Ambiguous,

    #[error("failed to read credentials file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credentials from {origin}: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("service account private key is not a valid RSA PEM: {0}")]
    InvalidPrivateKey(jsonwebtoken::errors::Error),

    #[error("Could not load the default credentials. Set FIREBASE_SERVICE_ACCOUNT_JSON, FIREBASE_SERVICE_ACCOUNT_PATH or GOOGLE_APPLICATION_CREDENTIALS")]
    NotFound,

    #[error("unable to determine the Google Cloud project id; set GOOGLE_CLOUD_PROJECT")]
    MissingProjectId,

    #[error("failed to obtain a Google access token: {0}")]
    TokenRequest(String),
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub quota_project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("quota_project_id", &self.quota_project_id)
            .finish_non_exhaustive()
    }
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// The JSON credential file formats produced by Google tooling
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Debug, Clone)]
pub enum GoogleCredentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
    /// Tokens come from the metadata server of the host VM
    Metadata { host: String },
}

/// Where the credentials were found, for the startup log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    InlineJson,
    ServiceAccountPath(PathBuf),
    ApplicationDefault(PathBuf),
    GcloudWellKnown(PathBuf),
    MetadataServer,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InlineJson => write!(f, "FIREBASE_SERVICE_ACCOUNT_JSON"),
            Self::ServiceAccountPath(path) => write!(f, "service account file {}", path.display()),
            Self::ApplicationDefault(path) => write!(f, "GOOGLE_APPLICATION_CREDENTIALS {}", path.display()),
            Self::GcloudWellKnown(path) => write!(f, "gcloud credentials {}", path.display()),
            Self::MetadataServer => write!(f, "GCE metadata server"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveredCredentials {
    pub credentials: GoogleCredentials,
    pub source: CredentialSource,
    pub project_id: String,
}

impl GoogleCredentials {
    fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(user) => user.quota_project_id.as_deref(),
            Self::Metadata { .. } => None,
        }
    }
}

/// Parse credential JSON as written by the Google Cloud console or gcloud
pub fn parse_credentials(json: &str, origin: &str) -> Result<GoogleCredentials, CredentialsError> {
    let file: CredentialFile = serde_json::from_str(json).map_err(|source| CredentialsError::Malformed {
        origin: origin.to_string(),
        source,
    })?;

    match file {
        CredentialFile::ServiceAccount(key) => {
            // Reject unusable keys now rather than on the first directory lookup
            EncodingKey::from_rsa_pem(key.private_key.as_bytes())
                .map_err(CredentialsError::InvalidPrivateKey)?;
            Ok(GoogleCredentials::ServiceAccount(key))
        }
        CredentialFile::AuthorizedUser(user) => Ok(GoogleCredentials::AuthorizedUser(user)),
    }
}

async fn read_credentials_file(path: &Path) -> Result<GoogleCredentials, CredentialsError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CredentialsError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
    parse_credentials(&json, &path.display().to_string())
}

// An empty variable in `.env` deserializes as an empty path
fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|path| !path.as_os_str().is_empty())
}

fn well_known_file(config: &BridgeConfig) -> Option<PathBuf> {
    let dir = match (&config.cloudsdk_config, &config.home) {
        (Some(dir), _) => dir.clone(),
        (None, Some(home)) => home.join(".config").join("gcloud"),
        (None, None) => return None,
    };
    Some(dir.join(WELL_KNOWN_FILE))
}

/// Probe the metadata server, returning the project id it reports
async fn probe_metadata_server(http: &reqwest::Client, host: &str) -> Option<String> {
    let url = format!("http://{}/computeMetadata/v1/project/project-id", host);
    let response = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?;
    let project = response.text().await.ok()?;
    let project = project.trim();
    (!project.is_empty()).then(|| project.to_string())
}

/// Establish the credentials used for token verification and directory access
pub async fn discover(config: &BridgeConfig, http: &reqwest::Client) -> Result<DiscoveredCredentials, CredentialsError> {
    let inline = config
        .firebase_service_account_json
        .as_deref()
        .filter(|json| !json.trim().is_empty());

    let explicit_path = non_empty(&config.firebase_service_account_path);

    let mut metadata_project = None;
    let (credentials, source) = match (inline, explicit_path) {
        (Some(_), Some(_)) => return Err(CredentialsError::Ambiguous),
        (Some(json), None) => (
            parse_credentials(json, "FIREBASE_SERVICE_ACCOUNT_JSON")?,
            CredentialSource::InlineJson,
        ),
        (None, Some(path)) => (
            read_credentials_file(path).await?,
            CredentialSource::ServiceAccountPath(path.to_path_buf()),
        ),
        (None, None) => {
            if let Some(path) = non_empty(&config.google_application_credentials) {
                (
                    read_credentials_file(path).await?,
                    CredentialSource::ApplicationDefault(path.to_path_buf()),
                )
            } else if let Some(path) = well_known_file(config).filter(|path| path.is_file()) {
                (
                    read_credentials_file(&path).await?,
                    CredentialSource::GcloudWellKnown(path),
                )
            } else {
                let host = config
                    .gce_metadata_host
                    .clone()
                    .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
                tracing::debug!("No credential file found, probing metadata server at {}", host);
                metadata_project = probe_metadata_server(http, &host).await;
                if metadata_project.is_none() {
                    return Err(CredentialsError::NotFound);
                }
                (GoogleCredentials::Metadata { host }, CredentialSource::MetadataServer)
            }
        }
    };

    let project_id = config
        .project_override()
        .map(str::to_string)
        .or_else(|| credentials.project_id().map(str::to_string))
        .or(metadata_project)
        .ok_or(CredentialsError::MissingProjectId)?;

    Ok(DiscoveredCredentials {
        credentials,
        source,
        project_id,
    })
}
