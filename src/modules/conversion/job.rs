use serde::{Deserialize, Serialize};

use super::dispatcher::JobError;

/// One conversion request as published to the queue. Parsed fresh for
/// every delivery and discarded once the message is resolved.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionJob {
    pub bucket: String,
    pub input_key: String,
    pub output_key: String,
}

impl ConversionJob {
    pub fn parse(body: &[u8]) -> Result<Self, JobError> {
        let job: ConversionJob = serde_json::from_slice(body)
            .map_err(|e| JobError::Malformed(e.to_string()))?;
        job.validate()?;
        Ok(job)
    }

    fn validate(&self) -> Result<(), JobError> {
        if self.bucket.is_empty() {
            return Err(JobError::Malformed("bucket is empty".to_string()));
        }
        if self.input_key.is_empty() || basename(&self.input_key).is_empty() {
            return Err(JobError::Malformed("inputKey has no file name".to_string()));
        }
        if self.output_key.is_empty() || basename(&self.output_key).is_empty() {
            return Err(JobError::Malformed("outputKey has no file name".to_string()));
        }
        Ok(())
    }

    /// Extension of `outputKey`, which selects the target format.
    pub fn output_extension(&self) -> &str {
        let name = basename(&self.output_key);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext,
            _ => "",
        }
    }
}

pub fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
