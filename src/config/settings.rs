use serde::Deserialize;
use crate::config::env::{self, EnvKey};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub amqp_url: String,
    pub queue_name: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub staging_dir: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            amqp_url: env::get(EnvKey::AmqpUrl)?,
            queue_name: env::get_or(EnvKey::QueueName, "pdf-conversion-queue"),
            s3_endpoint: env::get(EnvKey::S3Endpoint)?,
            s3_region: env::get_or(EnvKey::S3Region, "ap-northeast-1"),
            s3_access_key: env::get(EnvKey::S3AccessKey)?,
            s3_secret_key: env::get(EnvKey::S3SecretKey)?,
            staging_dir: env::get_or(EnvKey::StagingDir, "/tmp"),
        })
    }
}
