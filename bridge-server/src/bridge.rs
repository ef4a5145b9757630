// bridge-server/src/bridge.rs
use crate::error::ApiError;
use crate::firebase::IdTokenVerifier;
use common::mint_bridged_token;
use common::models::TokenExchangeResponse;
use std::sync::Arc;

/// Exchanges verified Firebase ID tokens for Supabase JWTs
pub struct TokenBridge {
    verifier: Arc<dyn IdTokenVerifier>,
    secret: Vec<u8>,
    lifetime_secs: u64,
    expected_audience: Option<String>,
}

impl TokenBridge {
    pub fn new(
        verifier: Arc<dyn IdTokenVerifier>,
        secret: &str,
        lifetime_secs: u64,
        expected_audience: Option<String>,
    ) -> Self {
        Self {
            verifier,
            secret: secret.as_bytes().to_vec(),
            lifetime_secs,
            expected_audience,
        }
    }

    pub fn lifetime_secs(&self) -> u64 {
        self.lifetime_secs
    }

    pub async fn exchange(&self, id_token: &str) -> Result<TokenExchangeResponse, ApiError> {
        let claims = self.verifier.verify(id_token).await.map_err(ApiError::from)?;

        if let Some(expected) = &self.expected_audience {
            if &claims.aud != expected {
                tracing::warn!(aud = %claims.aud, expected = %expected, "Firebase token project mismatch");
                return Err(ApiError::AudienceMismatch);
            }
        }

        let (supabase_jwt, minted) =
            mint_bridged_token(&claims.sub, claims.email.as_deref(), self.lifetime_secs, &self.secret)
                .map_err(|e| ApiError::Signing(e.to_string()))?;

        tracing::info!(uid = %minted.sub, exp = minted.exp, "Issued Supabase JWT");
        Ok(TokenExchangeResponse {
            supabase_jwt,
            expires_in_seconds: self.lifetime_secs,
        })
    }
}
