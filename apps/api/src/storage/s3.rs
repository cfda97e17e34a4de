use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::info;

use super::{snapshot_key, SnapshotStore, StorageError};
use crate::models::snapshot::AnalysisSnapshot;

const PREFIX: &str = "snapshots/";

/// Snapshots as `snapshots/{username}.json` objects in one bucket (S3 or MinIO).
pub struct S3SnapshotStore {
    client: Client,
    bucket: String,
}

impl S3SnapshotStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    fn key(username: &str) -> String {
        format!("{PREFIX}{}", snapshot_key(username))
    }
}

#[async_trait]
impl SnapshotStore for S3SnapshotStore {
    async fn save(&self, snapshot: &AnalysisSnapshot) -> Result<(), StorageError> {
        let key = Self::key(&snapshot.username);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(serde_json::to_vec(snapshot)?))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(format!("S3 upload failed: {e}")))?;
        info!("Uploaded snapshot to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn load(&self, username: &str) -> Result<Option<AnalysisSnapshot>, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(Self::key(username))
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(StorageError::ObjectStore(format!(
                    "S3 download failed: {service_err}"
                )));
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::ObjectStore(format!("S3 body read failed: {e}")))?
            .into_bytes();
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(PREFIX)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| StorageError::ObjectStore(format!("S3 list failed: {e}")))?;

            names.extend(
                page.contents()
                    .iter()
                    .filter_map(|o| o.key())
                    .filter_map(|k| k.strip_prefix(PREFIX))
                    .filter_map(|k| k.strip_suffix(".json"))
                    .map(str::to_string),
            );

            match page.next_continuation_token() {
                Some(next) if page.is_truncated().unwrap_or(false) => token = Some(next.to_string()),
                _ => break,
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, username: &str) -> Result<bool, StorageError> {
        let existed = match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(Self::key(username))
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                let service_err = e.into_service_error();
                if !service_err.is_not_found() {
                    return Err(StorageError::ObjectStore(format!("S3 head failed: {service_err}")));
                }
                false
            }
        };
        if existed {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(Self::key(username))
                .send()
                .await
                .map_err(|e| StorageError::ObjectStore(format!("S3 delete failed: {e}")))?;
        }
        Ok(existed)
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}
