// bridge-server/src/main.rs
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use bridge_server::api::{self, RATE_LIMITED_PATHS};
use bridge_server::middleware::RateLimiter;
use bridge_server::AppState;
use common::{setup_tracing, BridgeConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Pick up a local .env before anything reads the environment
    dotenv::dotenv().ok();

    setup_tracing(&std::env::var("LOG_LEVEL").unwrap_or_default());

    let config = BridgeConfig::load().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        std::io::Error::other(e)
    })?;

    // Refuse to start rather than serve requests we cannot answer correctly
    let state = AppState::initialize(&config).await.map_err(|e| {
        tracing::error!("{}", e);
        std::io::Error::other(e)
    })?;

    let server_addr = config.bind_addr();
    tracing::info!("supabase-token server listening on http://{}", server_addr);

    let state_data = web::Data::new(state);
    let rate_limiter = RateLimiter::new(
        RATE_LIMITED_PATHS.iter().map(|p| p.to_string()).collect(),
        config.resolve_rate_limit_per_minute,
    )
    .trust_forwarded_for(config.trust_forwarded_for);

    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(rate_limiter.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
