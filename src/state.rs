use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::infrastructure::storage::s3::StorageService;
use crate::modules::conversion::registry::ConversionRegistry;
use crate::modules::conversion::staging::StagingArea;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub queue: RabbitMqService,
    pub storage: StorageService,
    pub registry: Arc<ConversionRegistry>,
    pub staging: StagingArea,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        queue: RabbitMqService,
        storage: StorageService,
        registry: Arc<ConversionRegistry>,
    ) -> Self {
        let staging = StagingArea::new(&config.staging_dir);
        Self {
            config,
            queue,
            storage,
            registry,
            staging,
        }
    }
}
