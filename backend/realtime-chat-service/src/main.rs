use actix_web::{web, App, HttpServer};
use realtime_chat_service::{
    config, db, error, logging, middleware::JwtVerifier, routes, state::AppState,
    store::PgStore,
};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

fn cors(allowed_origins: &[String]) -> actix_cors::Cors {
    let cors = actix_cors::Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);
    if allowed_origins.is_empty() {
        return cors.allow_any_origin();
    }
    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

#[actix_web::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = config::Config::from_env()?;

    let pool = db::init_pool(&cfg.database_url, cfg.db_max_connections)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    let verifier = JwtVerifier::from_source(&cfg.jwt_key)?;
    let state = AppState::new(Arc::new(PgStore::new(pool)), verifier, cfg);

    let bind_addr = format!("0.0.0.0:{}", state.config.port);
    tracing::info!(%bind_addr, "starting realtime-chat-service");

    let allowed_origins = state.config.cors_allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&allowed_origins))
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind REST: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("REST server: {e}")))
}
