// common/src/models/credential.rs
use serde::{Deserialize, Serialize};

/// Role claim Supabase maps to its `authenticated` Postgres role.
pub const BRIDGED_ROLE: &str = "authenticated";
/// Audience Supabase checks on incoming JWTs.
pub const BRIDGED_AUDIENCE: &str = "authenticated";

/// Claims of the credential minted for Supabase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgedClaims {
    /// Firebase uid of the verified caller
    pub sub: String,
    pub role: String,
    /// Serialized as `null` when the Firebase token carried no email
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

impl BridgedClaims {
    pub fn new(subject: String, email: Option<String>, issued_at: i64, lifetime_secs: u64) -> Self {
        Self {
            sub: subject,
            role: BRIDGED_ROLE.to_string(),
            email,
            iat: issued_at,
            exp: issued_at + lifetime_secs as i64,
            aud: BRIDGED_AUDIENCE.to_string(),
        }
    }
}

/// Response body of `POST /supabase-token`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeResponse {
    pub supabase_jwt: String,
    pub expires_in_seconds: u64,
}
