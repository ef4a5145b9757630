// common/src/utils.rs
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use jsonwebtoken::{encode, decode, Header, Algorithm, Validation, EncodingKey, DecodingKey};
use crate::models::{BridgedClaims, BRIDGED_AUDIENCE};

/// Setup tracing for consistent logging across services
pub fn setup_tracing(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Current time as seconds since the Unix epoch
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Sign bridged claims with the shared Supabase secret (HS256)
pub fn sign_bridged_token(claims: &BridgedClaims, secret: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Mint a bridged credential for `subject`, issued now
pub fn mint_bridged_token(
    subject: &str,
    email: Option<&str>,
    lifetime_secs: u64,
    secret: &[u8],
) -> Result<(String, BridgedClaims), jsonwebtoken::errors::Error> {
    let claims = BridgedClaims::new(
        subject.to_string(),
        email.map(str::to_string),
        unix_now(),
        lifetime_secs,
    );
    let token = sign_bridged_token(&claims, secret)?;
    Ok((token, claims))
}

/// Validate a bridged credential the way Supabase would
pub fn decode_bridged_token(token: &str, secret: &[u8]) -> Result<BridgedClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[BRIDGED_AUDIENCE]);

    let token_data = decode::<BridgedClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BRIDGED_ROLE;

    const SECRET: &[u8] = b"super-secret-jwt-token-with-at-least-32-characters";

    #[test]
    fn test_minted_token_carries_subject_and_fixed_claims() {
        let (token, claims) = mint_bridged_token("u123", Some("a@b.com"), 3600, SECRET).unwrap();
        let decoded = decode_bridged_token(&token, SECRET).unwrap();

        assert_eq!(decoded, claims);
        assert_eq!(decoded.sub, "u123");
        assert_eq!(decoded.role, BRIDGED_ROLE);
        assert_eq!(decoded.aud, BRIDGED_AUDIENCE);
        assert_eq!(decoded.email.as_deref(), Some("a@b.com"));
        assert_eq!(decoded.exp - decoded.iat, 3600);
    }

    #[test]
    fn test_missing_email_serializes_as_null() {
        let claims = BridgedClaims::new("u1".into(), None, 1_700_000_000, 60);
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json["email"].is_null());
        assert_eq!(json["exp"], 1_700_000_060);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let (token, _) = mint_bridged_token("u123", None, 60, SECRET).unwrap();
        assert!(decode_bridged_token(&token, b"another-secret").is_err());
    }
}
