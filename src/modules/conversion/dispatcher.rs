use thiserror::Error;
use tracing::{error, info, warn};

use crate::infrastructure::storage::{ObjectStorage, StorageError};
use super::job::ConversionJob;
use super::registry::{ConversionError, ConversionRegistry, OutputFormat};
use super::staging::StagingArea;

/// How the consumer must resolve the originating delivery. Produced once
/// per message, consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acknowledge,
    RejectRequeue,
    RejectDrop,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("malformed job payload: {0}")]
    Malformed(String),
    #[error("unsupported output format: .{0}")]
    UnsupportedFormat(String),
    #[error("input object does not exist: {0}")]
    SourceNotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),
}

impl From<StorageError> for JobError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(key) => JobError::SourceNotFound(key),
            StorageError::Transient(msg) => JobError::Storage(msg),
        }
    }
}

/// Turns one raw message body into a resolved outcome. Every job-scoped
/// error is absorbed here; nothing propagates out to the consume loop.
pub async fn dispatch<S: ObjectStorage>(
    storage: &S,
    registry: &ConversionRegistry,
    staging: &StagingArea,
    body: &[u8],
    redelivered: bool,
) -> DeliveryOutcome {
    match run_job(storage, registry, staging, body).await {
        Ok(output_key) => {
            info!("✅ Job completed: {}", output_key);
            DeliveryOutcome::Acknowledge
        }
        Err(e) => resolve_error(e, redelivered),
    }
}

async fn run_job<S: ObjectStorage>(
    storage: &S,
    registry: &ConversionRegistry,
    staging: &StagingArea,
    body: &[u8],
) -> Result<String, JobError> {
    let job = ConversionJob::parse(body)?;

    let ext = job.output_extension();
    let task = OutputFormat::from_extension(ext)
        .and_then(|format| registry.lookup(format))
        .ok_or_else(|| JobError::UnsupportedFormat(ext.to_string()))?;

    if !storage.exists(&job.bucket, &job.input_key).await? {
        return Err(JobError::SourceNotFound(job.input_key.clone()));
    }

    // Dropped when this function returns, on success and error alike.
    let pair = staging.allocate(&job);

    info!("⬇️ Downloading {}", job.input_key);
    storage
        .download(&job.bucket, &job.input_key, &pair.input_path)
        .await?;

    (task.convert)(&pair.input_path, &pair.output_path)?;

    info!("⬆️ Uploading {}", job.output_key);
    storage
        .upload(
            &pair.output_path,
            &job.bucket,
            &job.output_key,
            task.content_type,
        )
        .await?;

    Ok(job.output_key)
}

fn resolve_error(err: JobError, redelivered: bool) -> DeliveryOutcome {
    match err {
        // Permanently missing source: dropped, not failed.
        JobError::SourceNotFound(key) => {
            warn!("🗑️ Input not found, dropping job: {}", key);
            DeliveryOutcome::RejectDrop
        }
        // Transient outage: requeue once, drop on the redelivery. The
        // redelivered flag is the broker's own attempt marker, so this
        // cannot loop forever.
        JobError::Storage(msg) if !redelivered => {
            warn!("♻️ Transient storage error, requeueing: {}", msg);
            DeliveryOutcome::RejectRequeue
        }
        err => {
            error!("❌ Job failed: {}", err);
            DeliveryOutcome::RejectDrop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::conversion::registry::{ConversionTask, OutputFormat};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    const DOCX_MIME: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    const BODY: &[u8] = br#"{"bucket":"b","inputKey":"in/doc.pdf","outputKey":"out/doc.docx"}"#;

    #[derive(Default)]
    struct FakeStorage {
        objects: Mutex<HashMap<(String, String), (Vec<u8>, String)>>,
        calls: Mutex<Vec<String>>,
        fail_transiently: bool,
    }

    impl FakeStorage {
        fn with_object(bucket: &str, key: &str, data: &[u8]) -> Self {
            let fake = Self::default();
            fake.objects
                .lock()
                .unwrap()
                .insert((bucket.to_string(), key.to_string()), (data.to_vec(), String::new()));
            fake
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn object(&self, bucket: &str, key: &str) -> Option<(Vec<u8>, String)> {
            self.objects
                .lock()
                .unwrap()
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
        }
    }

    impl ObjectStorage for FakeStorage {
        async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
            self.calls.lock().unwrap().push(format!("exists {key}"));
            if self.fail_transiently {
                return Err(StorageError::Transient("connection reset".to_string()));
            }
            Ok(self
                .objects
                .lock()
                .unwrap()
                .contains_key(&(bucket.to_string(), key.to_string())))
        }

        async fn download(
            &self,
            bucket: &str,
            key: &str,
            local_path: &Path,
        ) -> Result<(), StorageError> {
            self.calls.lock().unwrap().push(format!("download {key}"));
            let objects = self.objects.lock().unwrap();
            let (data, _) = objects
                .get(&(bucket.to_string(), key.to_string()))
                .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
            std::fs::write(local_path, data)
                .map_err(|e| StorageError::Transient(e.to_string()))?;
            Ok(())
        }

        async fn upload(
            &self,
            local_path: &Path,
            bucket: &str,
            key: &str,
            content_type: &str,
        ) -> Result<(), StorageError> {
            self.calls.lock().unwrap().push(format!("upload {key}"));
            let data = std::fs::read(local_path)
                .map_err(|e| StorageError::Transient(e.to_string()))?;
            self.objects.lock().unwrap().insert(
                (bucket.to_string(), key.to_string()),
                (data, content_type.to_string()),
            );
            Ok(())
        }
    }

    fn copying_registry() -> ConversionRegistry {
        let mut registry = ConversionRegistry::new();
        registry.register(
            OutputFormat::Docx,
            ConversionTask {
                convert: Box::new(|input, output| {
                    let data = std::fs::read(input)?;
                    std::fs::write(output, data)?;
                    Ok(())
                }),
                content_type: DOCX_MIME,
            },
        );
        registry
    }

    fn failing_registry() -> ConversionRegistry {
        let mut registry = ConversionRegistry::new();
        registry.register(
            OutputFormat::Docx,
            ConversionTask {
                convert: Box::new(|_, _| Err(ConversionError::Tool("boom".to_string()))),
                content_type: DOCX_MIME,
            },
        );
        registry
    }

    fn staging_in(dir: &tempfile::TempDir) -> StagingArea {
        StagingArea::new(dir.path())
    }

    fn staging_is_empty(dir: &tempfile::TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn malformed_body_is_dropped_without_storage_calls() {
        let storage = FakeStorage::default();
        let dir = tempfile::tempdir().unwrap();

        let outcome = dispatch(&storage, &copying_registry(), &staging_in(&dir), b"{not json", false).await;

        assert_eq!(outcome, DeliveryOutcome::RejectDrop);
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_fields_are_dropped_without_storage_calls() {
        let storage = FakeStorage::default();
        let dir = tempfile::tempdir().unwrap();
        let body = br#"{"bucket":"","inputKey":"in/doc.pdf","outputKey":"out/doc.docx"}"#;

        let outcome = dispatch(&storage, &copying_registry(), &staging_in(&dir), body, false).await;

        assert_eq!(outcome, DeliveryOutcome::RejectDrop);
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn unsupported_format_is_dropped_before_any_storage_call() {
        let storage = FakeStorage::with_object("b", "in/doc.pdf", b"pdf");
        let dir = tempfile::tempdir().unwrap();
        let body = br#"{"bucket":"b","inputKey":"in/doc.pdf","outputKey":"out/doc.xyz"}"#;

        let outcome = dispatch(&storage, &copying_registry(), &staging_in(&dir), body, false).await;

        assert_eq!(outcome, DeliveryOutcome::RejectDrop);
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_input_is_dropped_before_download() {
        let storage = FakeStorage::default();
        let dir = tempfile::tempdir().unwrap();

        let outcome = dispatch(&storage, &copying_registry(), &staging_in(&dir), BODY, false).await;

        assert_eq!(outcome, DeliveryOutcome::RejectDrop);
        assert_eq!(storage.calls(), vec!["exists in/doc.pdf"]);
        assert!(staging_is_empty(&dir));
    }

    #[tokio::test]
    async fn successful_job_acknowledges_and_uploads_with_registry_content_type() {
        let storage = FakeStorage::with_object("b", "in/doc.pdf", b"pdf bytes");
        let dir = tempfile::tempdir().unwrap();

        let outcome = dispatch(&storage, &copying_registry(), &staging_in(&dir), BODY, false).await;

        assert_eq!(outcome, DeliveryOutcome::Acknowledge);
        let (data, content_type) = storage.object("b", "out/doc.docx").unwrap();
        assert_eq!(data, b"pdf bytes");
        assert_eq!(content_type, DOCX_MIME);
        assert!(staging_is_empty(&dir));
    }

    #[tokio::test]
    async fn redelivery_after_success_is_idempotent() {
        let storage = FakeStorage::with_object("b", "in/doc.pdf", b"pdf bytes");
        let dir = tempfile::tempdir().unwrap();
        let registry = copying_registry();
        let staging = staging_in(&dir);

        let first = dispatch(&storage, &registry, &staging, BODY, false).await;
        let second = dispatch(&storage, &registry, &staging, BODY, true).await;

        assert_eq!(first, DeliveryOutcome::Acknowledge);
        assert_eq!(second, DeliveryOutcome::Acknowledge);
        let (data, content_type) = storage.object("b", "out/doc.docx").unwrap();
        assert_eq!(data, b"pdf bytes");
        assert_eq!(content_type, DOCX_MIME);
    }

    #[tokio::test]
    async fn transient_storage_error_requeues_on_first_delivery() {
        let storage = FakeStorage {
            fail_transiently: true,
            ..FakeStorage::default()
        };
        let dir = tempfile::tempdir().unwrap();

        let outcome = dispatch(&storage, &copying_registry(), &staging_in(&dir), BODY, false).await;

        assert_eq!(outcome, DeliveryOutcome::RejectRequeue);
    }

    #[tokio::test]
    async fn transient_storage_error_drops_on_redelivery() {
        let storage = FakeStorage {
            fail_transiently: true,
            ..FakeStorage::default()
        };
        let dir = tempfile::tempdir().unwrap();

        let outcome = dispatch(&storage, &copying_registry(), &staging_in(&dir), BODY, true).await;

        assert_eq!(outcome, DeliveryOutcome::RejectDrop);
    }

    #[tokio::test]
    async fn conversion_failure_drops_and_cleans_staging() {
        let storage = FakeStorage::with_object("b", "in/doc.pdf", b"pdf bytes");
        let dir = tempfile::tempdir().unwrap();

        let outcome = dispatch(&storage, &failing_registry(), &staging_in(&dir), BODY, false).await;

        assert_eq!(outcome, DeliveryOutcome::RejectDrop);
        assert!(staging_is_empty(&dir));
        assert!(storage.object("b", "out/doc.docx").is_none());
    }
}
