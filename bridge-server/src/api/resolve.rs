// bridge-server/src/api/resolve.rs
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use tracing::Instrument;
use crate::error::ApiError;
use crate::state::AppState;
use crate::utils::token::generate_request_id;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveQuery {
    pub user_id: Option<String>,
}

/// Look up the sign-in email for a human-facing user id.
///
/// Unauthenticated: anyone can learn the email behind a guessed id, which
/// is why the route sits behind the rate limiter.
#[get("/resolve-userid")]
pub async fn resolve_user_id(
    query: web::Query<ResolveQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let request_id = generate_request_id();
    let span = tracing::info_span!("resolve_userid", request_id = %request_id);

    async move {
        let user_id = query.user_id.as_deref().unwrap_or_default();
        match state.resolver.resolve(user_id).await {
            Ok(user) => {
                tracing::info!(uid = %user.uid, "Resolved userId");
                Ok(HttpResponse::Ok().json(user))
            }
            Err(err) => {
                tracing::warn!("userId lookup failed: {}", err);
                Err(ApiError::from(err))
            }
        }
    }
    .instrument(span)
    .await
}
