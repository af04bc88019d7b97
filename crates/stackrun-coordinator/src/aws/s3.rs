//! S3 bucket and object management
//!
//! Covers the artifact bucket (create, upload, delete) and the primitives the
//! sweeper needs to empty versioned buckets: a bulk pass over current objects
//! and a cursor-paginated listing of every version and delete marker.

use crate::aws::context::{AwsContext, FromAwsContext};
use anyhow::{Context, Result};
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use stackrun_common::defaults::MAX_DELETE_BATCH;
use tracing::{debug, info};

/// Resume position in a ListObjectVersions walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionCursor {
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

impl VersionCursor {
    pub fn is_start(&self) -> bool {
        self.key_marker.is_none() && self.version_id_marker.is_none()
    }
}

/// One object version or delete marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersionRef {
    pub key: String,
    pub version_id: Option<String>,
    pub delete_marker: bool,
}

/// A page of ListObjectVersions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPage {
    /// Versions and delete markers on this page
    pub entries: Vec<ObjectVersionRef>,
    /// Cursor for the following page; `None` when the listing is complete
    pub next: Option<VersionCursor>,
}

/// Outcome of one DeleteObjects request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeleteOutcome {
    pub deleted: usize,
    /// Per-key failures reported by S3 (`key: message`)
    pub errors: Vec<String>,
}

/// S3 client for artifacts and bucket purging
pub struct S3Client {
    client: Client,
    region: String,
}

impl FromAwsContext for S3Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.s3_client(),
            region: ctx.region().to_string(),
        }
    }
}

impl S3Client {
    /// Create a new S3 client
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create a bucket unless we already own it
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        info!(bucket = %bucket, region = %self.region, "Ensuring S3 bucket");

        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                if crate::aws::classify_sdk_error(&e).is_already_exists() {
                    debug!(bucket = %bucket, "Bucket already owned");
                    return Ok(());
                }
                Err(anyhow::Error::new(e)).with_context(|| format!("Failed to create bucket {bucket}"))
            }
        }
    }

    /// Upload bytes to S3
    pub async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        debug!(bucket = %bucket, key = %key, size = data.len(), "Uploading bytes");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .context("Failed to upload bytes")?;

        Ok(())
    }

    /// Delete every current object (one DeleteObjects call per listing page).
    ///
    /// On a versioned bucket this only adds delete markers; the versions
    /// themselves are removed by the version walk. Per-key failures of every
    /// batch are collected into the returned outcome.
    pub async fn remove_current_objects(&self, bucket: &str) -> Result<BatchDeleteOutcome> {
        let mut total = BatchDeleteOutcome::default();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .with_context(|| format!("Failed to list objects in {bucket}"))?;

            let entries: Vec<ObjectVersionRef> = response
                .contents()
                .iter()
                .filter_map(|o| o.key())
                .map(|key| ObjectVersionRef {
                    key: key.to_string(),
                    version_id: None,
                    delete_marker: false,
                })
                .collect();

            for batch in entries.chunks(MAX_DELETE_BATCH) {
                let outcome = self.delete_object_batch(bucket, batch.to_vec()).await?;
                total.deleted += outcome.deleted;
                total.errors.extend(outcome.errors);
            }

            match (response.is_truncated(), response.next_continuation_token()) {
                (Some(true), Some(token)) => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(total)
    }

    /// One page of object versions and delete markers
    pub async fn list_object_versions(
        &self,
        bucket: &str,
        cursor: &VersionCursor,
    ) -> Result<VersionPage> {
        let response = self
            .client
            .list_object_versions()
            .bucket(bucket)
            .set_key_marker(cursor.key_marker.clone())
            .set_version_id_marker(cursor.version_id_marker.clone())
            .send()
            .await
            .with_context(|| format!("Failed to list object versions in {bucket}"))?;

        let versions = response.versions().iter().filter_map(|v| {
            Some(ObjectVersionRef {
                key: v.key()?.to_string(),
                version_id: v.version_id().map(str::to_string),
                delete_marker: false,
            })
        });
        let markers = response.delete_markers().iter().filter_map(|m| {
            Some(ObjectVersionRef {
                key: m.key()?.to_string(),
                version_id: m.version_id().map(str::to_string),
                delete_marker: true,
            })
        });
        let entries = versions.chain(markers).collect();

        let next = if response.is_truncated() == Some(true) {
            Some(VersionCursor {
                key_marker: response.next_key_marker().map(str::to_string),
                version_id_marker: response.next_version_id_marker().map(str::to_string),
            })
        } else {
            None
        };

        Ok(VersionPage { entries, next })
    }

    /// Delete up to `MAX_DELETE_BATCH` objects or versions in one request
    pub async fn delete_object_batch(
        &self,
        bucket: &str,
        entries: Vec<ObjectVersionRef>,
    ) -> Result<BatchDeleteOutcome> {
        if entries.is_empty() {
            return Ok(BatchDeleteOutcome::default());
        }
        anyhow::ensure!(
            entries.len() <= MAX_DELETE_BATCH,
            "DeleteObjects batch of {} exceeds the {} entry limit",
            entries.len(),
            MAX_DELETE_BATCH
        );

        let objects = entries
            .iter()
            .map(|e| {
                ObjectIdentifier::builder()
                    .key(&e.key)
                    .set_version_id(e.version_id.clone())
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to build object identifiers")?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .context("Failed to build delete request")?;

        let response = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .with_context(|| format!("Failed to delete objects in {bucket}"))?;

        let errors: Vec<String> = response
            .errors()
            .iter()
            .map(|e| {
                format!(
                    "{}: {}",
                    e.key().unwrap_or("?"),
                    e.message().or(e.code()).unwrap_or("unknown error")
                )
            })
            .collect();

        // Quiet mode only reports failures
        Ok(BatchDeleteOutcome {
            deleted: entries.len() - errors.len(),
            errors,
        })
    }

    /// Delete an (empty) bucket
    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        info!(bucket = %bucket, "Deleting bucket");
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .with_context(|| format!("Failed to delete bucket {bucket}"))?;
        Ok(())
    }
}

/// Trait for S3 operations.
#[allow(async_fn_in_trait)] // Internal use only, the orchestrator never spawns these futures
#[cfg_attr(test, mockall::automock)]
pub trait BucketOperations {
    /// Create a bucket unless it already exists and is ours
    async fn ensure_bucket(&self, bucket: &str) -> Result<()>;

    /// Upload one object
    async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Bulk-delete current objects
    async fn remove_current_objects(&self, bucket: &str) -> Result<BatchDeleteOutcome>;

    /// One page of versions and delete markers
    async fn list_object_versions(&self, bucket: &str, cursor: &VersionCursor)
    -> Result<VersionPage>;

    /// Delete at most `MAX_DELETE_BATCH` entries
    async fn delete_object_batch(
        &self,
        bucket: &str,
        entries: Vec<ObjectVersionRef>,
    ) -> Result<BatchDeleteOutcome>;

    /// Delete an empty bucket
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

impl BucketOperations for S3Client {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        S3Client::ensure_bucket(self, bucket).await
    }

    async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        S3Client::upload_bytes(self, bucket, key, data, content_type).await
    }

    async fn remove_current_objects(&self, bucket: &str) -> Result<BatchDeleteOutcome> {
        S3Client::remove_current_objects(self, bucket).await
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        cursor: &VersionCursor,
    ) -> Result<VersionPage> {
        S3Client::list_object_versions(self, bucket, cursor).await
    }

    async fn delete_object_batch(
        &self,
        bucket: &str,
        entries: Vec<ObjectVersionRef>,
    ) -> Result<BatchDeleteOutcome> {
        S3Client::delete_object_batch(self, bucket, entries).await
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        S3Client::delete_bucket(self, bucket).await
    }
}
