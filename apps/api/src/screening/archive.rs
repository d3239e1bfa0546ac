//! Resume archive: copies accepted uploads to object storage.
//!
//! Each submission gets its own folder named after the job description and the
//! submission time. Archiving never affects the scoring task; failures are logged.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::screening::extractor::DocumentItem;

const FOLDER_PREFIX_CHARS: usize = 30;

#[async_trait]
pub trait ResumeArchive: Send + Sync {
    /// Stores one document under `key`, returning its URL.
    async fn store(&self, key: &str, item: &DocumentItem) -> anyhow::Result<String>;
}

/// Folder name: `<cleaned description>-Resume-List-<dd-mm-yy>-Time-<HH-MM-SS>`.
pub fn folder_name(job_description: &str, at: DateTime<Utc>) -> String {
    let cleaned: String = job_description
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .take(FOLDER_PREFIX_CHARS)
        .collect();
    let slug = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    format!(
        "{slug}-Resume-List-{}",
        at.format("%d-%m-%y-Time-%H-%M-%S")
    )
}

/// Uploads every structurally valid document into the submission's folder.
/// Returns the number of documents archived.
pub async fn archive_batch(
    archive: &dyn ResumeArchive,
    folder: &str,
    items: &[DocumentItem],
) -> usize {
    let mut stored = 0;
    for item in items.iter().filter(|i| i.validate().is_ok()) {
        let key = format!("{folder}/{}", item.filename);
        match archive.store(&key, item).await {
            Ok(url) => {
                info!("Archived {} to {url}", item.filename);
                stored += 1;
            }
            Err(e) => warn!("Failed to archive {}: {e:#}", item.filename),
        }
    }
    stored
}

pub struct S3ResumeArchive {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
}

impl S3ResumeArchive {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, region: String) -> Self {
        Self {
            client,
            bucket,
            region,
        }
    }
}

#[async_trait]
impl ResumeArchive for S3ResumeArchive {
    async fn store(&self, key: &str, item: &DocumentItem) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/pdf")
            .server_side_encryption(ServerSideEncryption::Aes256)
            .body(ByteStream::from(item.bytes.clone()))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        Ok(format!(
            "https://{}.s3.{}.amazonaws.com/{key}",
            self.bucket, self.region
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    #[derive(Default)]
    struct RecordingArchive {
        keys: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl ResumeArchive for RecordingArchive {
        async fn store(&self, key: &str, item: &DocumentItem) -> anyhow::Result<String> {
            if self.fail_on == Some(item.filename.as_str()) {
                anyhow::bail!("bucket unavailable");
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(format!("memory://{key}"))
        }
    }

    fn pdf(name: &str) -> DocumentItem {
        let mut bytes = b"%PDF-1.5\n".to_vec();
        bytes.resize(200, b' ');
        DocumentItem::new(name, bytes)
    }

    #[test]
    fn test_folder_name_cleans_and_truncates() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let name = folder_name("Senior Rust Engineer (Remote!) — Payments Platform Team", at);
        assert_eq!(
            name,
            "Senior-Rust-Engineer-Remote-P-Resume-List-09-03-24-Time-14-05-07"
        );
    }

    #[tokio::test]
    async fn test_archive_batch_skips_invalid_and_survives_failures() {
        let archive = RecordingArchive {
            fail_on: Some("flaky.pdf"),
            ..Default::default()
        };
        let items = vec![
            pdf("one.pdf"),
            DocumentItem::new("empty.pdf", Vec::new()),
            pdf("flaky.pdf"),
            pdf("two.pdf"),
        ];

        let stored = archive_batch(&archive, "folder", &items).await;

        assert_eq!(stored, 2);
        assert_eq!(
            *archive.keys.lock().unwrap(),
            vec!["folder/one.pdf".to_string(), "folder/two.pdf".to_string()]
        );
    }
}
