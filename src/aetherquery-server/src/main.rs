use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::{middleware::Logger, web, App, HttpServer};
use aetherquery_core::config::Config;
use aetherquery_server::api;
use anyhow::Result;

mod telemetry;

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::load("config.json").unwrap_or_else(|e| {
        eprintln!("Failed to load config.json ({}), using defaults", e);
        Config::default()
    });

    let _guard = telemetry::init_telemetry(&config.log_dir)?;

    tracing::info!("AetherQuery mock server starting");
    tracing::info!("  Database: {}", config.database);
    tracing::info!("  Version: {}", config.version);
    tracing::info!("  Simulated latency: {}ms", config.simulated_latency_ms);
    tracing::info!(
        "  CORS: enabled={}, origins={:?}",
        config.cors.enabled,
        config.cors.allowed_origins
    );

    let app_state = web::Data::new(api::AppState::new(config.clone()));

    let bind_addr = config.bind_addr();
    tracing::info!("Starting HTTP server on {}", bind_addr);

    let cors_config = config.cors.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();

        if cors_config.enabled {
            for origin in &cors_config.allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            cors = cors
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![
                    header::ACCEPT,
                    header::CONTENT_TYPE,
                    HeaderName::from_static("x-api-key"),
                    HeaderName::from_static("x-sql-key"),
                ])
                .expose_headers(vec![HeaderName::from_static("x-request-id")])
                .max_age(3600);
        }

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(api::configure)
    })
    .bind(&bind_addr)?
    .run();

    tracing::info!("Server running, press Ctrl+C to stop");
    server.await?;

    tracing::info!("Server stopped");
    Ok(())
}
