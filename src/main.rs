#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use fhir_auth_broker::{configure_routes, AuthBroker, BrokerSettings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Loads .env, Settings.toml and environment overrides, then the logger
    let settings = BrokerSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    // Incomplete provider configuration stops startup here
    let broker = AuthBroker::from_settings(&settings)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to initialize broker: {e}")))?;

    start_server(broker, &settings).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if binding or running the server fails.
async fn start_server(broker: AuthBroker, settings: &BrokerSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &broker, settings);

    let broker = web::Data::new(broker);
    HttpServer::new(move || {
        App::new()
            .app_data(broker.clone())
            .wrap(Logger::default())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, broker: &AuthBroker, settings: &BrokerSettings) {
    println!("Starting FHIR authorization broker on http://{bind_address}");
    println!("Provider: {}", broker.provider_name());
    println!("Environment: {:?}", settings.application.environment);
    println!();
    println!("Authorization endpoints:");
    println!("  GET      /auth/start    - Redirect to the provider");
    println!("  GET      /auth/callback - Provider redirect target");
    println!("  GET|POST /auth/logout   - Clear the session indicator");
    println!();
    println!("System endpoints:");
    println!("  GET  /ping - Health check");
    if settings.state.enforce_single_use {
        println!();
        println!("Single-use state enforcement is enabled (process-local)");
    }
}
