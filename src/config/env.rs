use std::env;

pub enum EnvKey {
    AmqpUrl,
    QueueName,
    S3Endpoint,
    S3Region,
    S3AccessKey,
    S3SecretKey,
    StagingDir,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::AmqpUrl => "CLOUDAMQP_URL",
            EnvKey::QueueName => "QUEUE_NAME",
            EnvKey::S3Endpoint => "AWS_S3_ENDPOINT",
            EnvKey::S3Region => "AWS_REGION",
            EnvKey::S3AccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::S3SecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::StagingDir => "STAGING_DIR",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}
