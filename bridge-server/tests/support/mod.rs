// Shared fixtures for the HTTP-level tests: a wiremock server standing in for
// Google (JWKS, OAuth token endpoint, Firestore) and signed Firebase tokens.
#![allow(dead_code)]

use bridge_server::AppState;
use common::{unix_now, BridgeConfig};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SIGNER_PEM: &str = include_str!("../fixtures/signer.pem");
pub const ROGUE_PEM: &str = include_str!("../fixtures/rogue.pem");
pub const JWKS: &str = include_str!("../fixtures/jwks.json");

pub const PROJECT: &str = "proj-1";
pub const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";
pub const DOCS: &str = "/v1/projects/proj-1/databases/(default)/documents";

/// Mock Google endpoints with working JWKS and OAuth token routes
pub async fn google() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(JWKS, "application/json"))
        .mount(&server)
        .await;
    mount_token_endpoint(&server).await;
    server
}

pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;
}

pub fn config(server: &MockServer, expected_audience: Option<&str>) -> BridgeConfig {
    let service_account = json!({
        "type": "service_account",
        "project_id": PROJECT,
        "private_key_id": "sa-key",
        "private_key": SIGNER_PEM,
        "client_email": "bridge@proj-1.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", server.uri()),
    });

    BridgeConfig {
        supabase_jwt_secret: Some(SECRET.to_string()),
        firebase_project_id: expected_audience.map(str::to_string),
        firebase_service_account_json: Some(service_account.to_string()),
        firebase_jwks_url: format!("{}/jwks", server.uri()),
        firestore_base_url: format!("{}/v1", server.uri()),
        verify_timeout_seconds: 2,
        ..Default::default()
    }
}

pub async fn state(server: &MockServer, expected_audience: Option<&str>) -> AppState {
    match AppState::initialize(&config(server, expected_audience)).await {
        Ok(state) => state,
        Err(e) => panic!("startup failed: {}", e),
    }
}

/// Claims of a fresh Firebase ID token for `PROJECT`
pub fn firebase_claims(sub: &str, email: Option<&str>) -> Value {
    let now = unix_now();
    json!({
        "iss": format!("https://securetoken.google.com/{}", PROJECT),
        "aud": PROJECT,
        "sub": sub,
        "user_id": sub,
        "auth_time": now - 30,
        "iat": now - 30,
        "exp": now + 3600,
        "email": email,
        "firebase": { "sign_in_provider": "password" },
    })
}

pub fn sign_with(pem: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("signer-kid".to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture key");
    encode(&header, claims, &key).expect("sign fixture token")
}

pub fn id_token(sub: &str, email: Option<&str>) -> String {
    sign_with(SIGNER_PEM, &firebase_claims(sub, email))
}

pub fn firestore_doc(collection: &str, id: &str, fields: &[(&str, &str)]) -> Value {
    let fields: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), json!({ "stringValue": v })))
        .collect();
    json!({
        "name": format!("projects/{}/databases/(default)/documents/{}/{}", PROJECT, collection, id),
        "fields": fields,
    })
}
