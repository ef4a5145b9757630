// bridge-server/src/api/token.rs
use actix_web::{post, web, http::header, HttpRequest, HttpResponse};
use tracing::Instrument;
use crate::error::ApiError;
use crate::state::AppState;
use crate::utils::token::{generate_request_id, parse_bearer};

/// Exchange a Firebase ID token for a Supabase JWT.
///
/// Header: `Authorization: Bearer <FIREBASE_ID_TOKEN>`.
/// Returns `{ supabaseJwt, expiresInSeconds }`.
#[post("/supabase-token")]
pub async fn exchange_token(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let request_id = generate_request_id();
    let span = tracing::info_span!("supabase_token", request_id = %request_id);

    async move {
        let id_token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer)
            .ok_or(ApiError::MissingToken)?;

        tracing::info!("Token received len={}", id_token.len());

        match state.bridge.exchange(id_token).await {
            Ok(response) => Ok(HttpResponse::Ok().json(response)),
            Err(err) => {
                match &err {
                    ApiError::Configuration(details) => {
                        tracing::error!("Firebase Admin config error: {}", details)
                    }
                    ApiError::InvalidToken(details) => {
                        tracing::warn!("verifyIdToken failed: {}", details)
                    }
                    other => tracing::warn!("Token exchange rejected: {}", other),
                }
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}
