use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use terminal_relay::constants::API_VERSION;
use terminal_relay::TerminalClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_gateway::{
    config::GatewayConfig, cors::build_cors, metrics::register_metrics,
    middleware::envelope_errors, routes, routes::relay::MAX_BODY_BYTES, state::AppState,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match GatewayConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;
    let static_dir = config.static_dir.clone();

    tracing::info!("Starting relay-gateway on port {}", port);
    tracing::info!("Remote API version: {}", API_VERSION);
    if let Some(ref base) = config.api_base {
        tracing::info!("Remote API base override: {}", base);
    }

    register_metrics();

    let state = match AppState::new(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to build payment service client: {}", e);
            std::process::exit(1);
        }
    };
    let state_data = web::Data::new(state);

    let governor_conf = match GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
    {
        Some(c) => c,
        None => {
            tracing::error!("Invalid rate limiter configuration");
            std::process::exit(1);
        }
    };

    match static_dir {
        Some(ref dir) => tracing::info!("Serving pages from: {}", dir),
        None => tracing::info!("STATIC_DIR not set; serving API routes only"),
    }

    HttpServer::new(move || {
        let mut app = App::new()
            .app_data(state_data.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .wrap(Logger::default())
            .wrap(build_cors(&allowed_origins))
            .wrap(Governor::new(&governor_conf))
            .wrap(from_fn(envelope_errors))
            .configure(routes::health::configure::<TerminalClient>)
            .configure(routes::relay::configure::<TerminalClient>);

        // Static files last (catch-all)
        if let Some(ref dir) = static_dir {
            app = app.configure(|cfg| routes::pages::configure(cfg, dir));
        }

        app
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
