use std::sync::Arc;
use actix_web::{web, App, HttpServer};
use actix_web::middleware::Logger;

use schoolfees::config::AppConfig;
use schoolfees::payment_gateway::StripeClient;
use schoolfees::server::handlers;
use schoolfees::state::PaymentStateManager;
use schoolfees::term_store::JsonTermStore;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();
    tracing::info!("Starting school fee payment node");

    let config = AppConfig::from_env()?;

    // --- Load fee terms ---
    let store = JsonTermStore::load(&config.fee_terms_dir)?;
    tracing::info!(
        "Loaded fee terms for {} students from {}",
        store.student_count(),
        store.dir().display()
    );

    // --- Spawn fee term watcher task ---
    let watched_store = store.clone();
    tokio::spawn(async move {
        if let Err(e) = watched_store.watch().await {
            tracing::error!("Fee term watcher failed: {}", e);
        }
    });

    let gateway = StripeClient::new(config.stripe_dev_mode)?
        .with_checkout(&config.currency, &config.success_url, &config.cancel_url);
    if gateway.dev_mode {
        tracing::warn!("Stripe running with development keys");
    }

    let state_manager = Arc::new(PaymentStateManager::new(Arc::new(store), Arc::new(gateway)));
    let state_data = web::Data::new(state_manager);

    tracing::info!("Starting HTTP server on {}", config.bind_addr);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)?
    .run();

    // Wait for server to finish
    server.await?;

    Ok(())
}
