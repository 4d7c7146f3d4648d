use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use deepscan::vendor::VendorFactory;
use deepscan::{configure_routes, AppConfig, Detector, RunMode};
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let http_client = reqwest::Client::builder()
        .user_agent(concat!("deepscan/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            log::error!("Failed to build HTTP client: {}", e);
            std::io::Error::other(e)
        })?;

    log::info!(
        "Detection vendor: {} at {}",
        config.vendor.kind,
        config.vendor.base_url
    );
    if config.run_mode == RunMode::Development {
        log::warn!("Running in development mode: failure details are returned to clients");
    }

    let factory = VendorFactory::new(http_client, config.vendor.clone())
        .with_verifier(config.credential_check.clone());
    let detector = web::Data::new(Detector::new(Arc::new(factory), config.run_mode));
    let frontend_dir = config.frontend_dir.clone();
    if let Some(dir) = &frontend_dir {
        log::info!("Serving front end from {}", dir);
    }

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                        actix_web::http::header::HeaderName::from_static(
                            deepscan::routes::CREDENTIAL_HEADER,
                        ),
                    ])
                    .max_age(3600),
            )
            .app_data(detector.clone())
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
