//! Emptying buckets owned by a stack before it is deleted
//!
//! Two phases per bucket: a bulk pass over current objects, then a
//! cursor-paginated walk over every version and delete marker. Nothing here
//! fails the caller; problems become [`SweepWarning`](super::types::SweepWarning)s.

use super::types::SweepReport;
use crate::aws::classify_anyhow_error;
use crate::aws::cloudformation::StackOperations;
use crate::aws::s3::{BucketOperations, VersionCursor};
use stackrun_common::defaults::MAX_DELETE_BATCH;
use stackrun_common::resource_kind::S3_BUCKET_TYPE;
use tracing::{debug, info, warn};

/// Empty every bucket owned by `unit_name`
pub async fn empty_child_resources<S, B>(stacks: &S, buckets: &B, unit_name: &str) -> SweepReport
where
    S: StackOperations,
    B: BucketOperations,
{
    let mut report = SweepReport::default();

    let children = match stacks.list_child_resources(unit_name).await {
        Ok(children) => children,
        Err(e) => {
            warn!(stack = %unit_name, error = ?e, "Failed to list stack resources, skipping sweep");
            report.warn(unit_name, format!("listing stack resources failed: {e:#}"));
            return report;
        }
    };

    let bucket_names: Vec<&str> = children
        .iter()
        .filter(|c| c.resource_type == S3_BUCKET_TYPE)
        .filter_map(|c| c.physical_id.as_deref())
        .collect();

    if bucket_names.is_empty() {
        debug!(stack = %unit_name, "No buckets to sweep");
        return report;
    }

    for bucket in bucket_names {
        report.merge(purge_bucket(buckets, bucket).await);
    }

    info!(
        stack = %unit_name,
        removed = report.removed,
        warnings = report.warnings.len(),
        "Sweep finished"
    );
    report
}

/// Remove every object, version, and delete marker from one bucket
pub async fn purge_bucket<B: BucketOperations>(buckets: &B, bucket: &str) -> SweepReport {
    let mut report = SweepReport::default();

    match buckets.remove_current_objects(bucket).await {
        Ok(outcome) => {
            debug!(bucket = %bucket, removed = outcome.deleted, "Removed current objects");
            report.removed += outcome.deleted;
            for error in outcome.errors {
                report.warn(bucket, error);
            }
        }
        Err(e) if classify_anyhow_error(&e).is_not_found() => {
            debug!(bucket = %bucket, "Bucket already gone");
            return report;
        }
        // The version walk below can still make progress
        Err(e) => report.warn(bucket, format!("removing current objects failed: {e:#}")),
    }

    let mut cursor = VersionCursor::default();
    loop {
        let page = match buckets.list_object_versions(bucket, &cursor).await {
            Ok(page) => page,
            Err(e) if classify_anyhow_error(&e).is_not_found() => break,
            Err(e) => {
                report.warn(bucket, format!("listing object versions failed: {e:#}"));
                break;
            }
        };

        for batch in page.entries.chunks(MAX_DELETE_BATCH) {
            match buckets.delete_object_batch(bucket, batch.to_vec()).await {
                Ok(outcome) => {
                    report.removed += outcome.deleted;
                    for error in outcome.errors {
                        report.warn(bucket, error);
                    }
                }
                Err(e) => report.warn(bucket, format!("batch delete failed: {e:#}")),
            }
        }

        match page.next {
            None => break,
            Some(next) if next == cursor || next.is_start() => {
                report.warn(bucket, "version listing did not advance, stopping sweep");
                break;
            }
            Some(next) => cursor = next,
        }
    }

    if !report.warnings.is_empty() {
        warn!(bucket = %bucket, warnings = report.warnings.len(), "Bucket sweep incomplete");
    }
    report
}
