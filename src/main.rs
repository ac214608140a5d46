use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use heartscan_gateway::config::{CorsSettings, LogFormat, LoggingSettings, Settings};
use heartscan_gateway::routes::{self, AppState};
use heartscan_gateway::services::UpstreamClient;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialize logging
///
/// `RUST_LOG` wins, then `LOG_LEVEL`, then the configured level.
/// `LOG_FORMAT` (or the configured format) picks json, pretty or plain text output.
fn init_tracing(logging: &LoggingSettings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let format = std::env::var("LOG_FORMAT")
        .map(|f| LogFormat::parse(&f))
        .unwrap_or_else(|_| logging.log_format());

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
        LogFormat::Text => subscriber.init(),
    }
}

fn build_cors(settings: &CorsSettings) -> Cors {
    if !settings.is_production() {
        return Cors::permissive();
    }

    let origins = settings.origins();
    Cors::default()
        .allowed_origin_fn(move |origin, _req| {
            origins.iter().any(|allowed| allowed.as_bytes() == origin.as_bytes())
        })
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let loaded = Settings::load();
    let logging = loaded
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting HeartScan gateway...");

    let settings = loaded.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Configuration error: {}", e))
    })?;

    info!("Configuration loaded successfully");

    let upstream = UpstreamClient::new(
        settings.upstream.base_url.clone(),
        settings.upstream.timeout_secs.map(Duration::from_secs),
    )
    .map_err(|e| {
        error!("Failed to create upstream client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!("Forwarding predictions to {}", upstream.api_url());

    let app_state = AppState::new(upstream).with_body_limit(settings.server.max_body_bytes);
    let cors_settings = settings.cors.clone();

    if cors_settings.is_production() {
        info!("CORS restricted to: {:?}", cors_settings.origins());
    } else {
        info!("CORS permissive ({} environment)", cors_settings.environment);
    }

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(build_cors(&cors_settings))
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
            .default_service(web::to(routes::info::not_found))
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
