use std::sync::Arc;

use anyhow::anyhow;
use dotenvy::dotenv;
use tracing::info;

use convert_worker::config::settings::AppConfig;
use convert_worker::infrastructure::queue::rabbitmq::RabbitMqService;
use convert_worker::infrastructure::storage::s3::StorageService;
use convert_worker::modules::conversion::registry::ConversionRegistry;
use convert_worker::state::AppState;
use convert_worker::workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting PDF conversion worker...");

    let config = AppConfig::new().map_err(|e| anyhow!("Missing required configuration: {}", e))?;

    let storage = StorageService::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_access_key,
        &config.s3_secret_key,
    )
    .await;

    let queue = RabbitMqService::new(&config.amqp_url).await?;

    let registry = Arc::new(ConversionRegistry::with_defaults());

    let state = AppState::new(config, queue, storage, registry);

    workers::consumer::run(state).await
}
