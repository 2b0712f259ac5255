mod api;
mod catalog;
mod config;
mod engine;
mod feedback;
mod model;
mod partition;
mod selector;
mod types;

use config::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("⚠️ Could not load .env: {}", err);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app_config = AppConfig::from_env();

    tracing::info!("🚀 Box advisor starting...");
    api::start_api_server(app_config.api, app_config.engine).await;
}
