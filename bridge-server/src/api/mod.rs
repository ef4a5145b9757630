// bridge-server/src/api/mod.rs
pub mod health;
pub mod resolve;
pub mod token;

use crate::error::ApiError;
use actix_web::web;

/// Path prefixes subject to the per-IP rate limit
pub const RATE_LIMITED_PATHS: &[&str] = &["/resolve-userid"];

pub fn configure(cfg: &mut web::ServiceConfig) {
    // Unparseable query strings (a repeated `userId`, say) get the JSON error body
    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        tracing::warn!("Rejected query string: {}", err);
        ApiError::MissingUserId.into()
    });

    cfg.app_data(query_config)
        .service(token::exchange_token)
        .service(resolve::resolve_user_id)
        .service(health::health);
}
