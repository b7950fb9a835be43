//! Smart Bookmark: personal bookmark manager with folders, tags and suggested filing.
//!
//! Entry point: loads settings, opens the store and serves the HTTP surface
//! until Ctrl-C.

use std::error::Error;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smart_bookmark::app::App;
use smart_bookmark::http;
use smart_bookmark::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut settings = SettingsEngine::new(None);
    if let Err(e) = settings.load() {
        warn!(error = %e, "could not load settings; using defaults");
    }
    settings.apply_env_overrides();
    let bind_address = settings.get_settings().server.bind_address.clone();

    let app = Arc::new(Mutex::new(App::new(settings)?));
    let router = http::router(app.clone());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, version = env!("CARGO_PKG_VERSION"), "Smart Bookmark listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app.lock().await.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
