//! Bucket sweeping over paginated, versioned listings

mod test_utils;

use stackrun_common::StackStatus;
use stackrun_common::defaults::MAX_DELETE_BATCH;
use stackrun_coordinator::orchestrator::{empty_child_resources, purge_bucket};
use test_utils::*;

const BUCKET: &str = "proj-dev-logs";

#[tokio::test]
async fn purges_thousands_of_versions_across_pages() {
    let cloud = FakeCloud::new();
    // 1500 keys x 2 versions, plus a delete marker on every odd key
    cloud.fill_bucket(BUCKET, 1500, 2);
    assert_eq!(cloud.bucket_len(BUCKET), Some(3750));

    let report = purge_bucket(&cloud, BUCKET).await;

    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(cloud.bucket_len(BUCKET), Some(0));
    let batches = cloud.batch_sizes();
    assert!(batches.len() > 1);
    assert!(batches.iter().all(|&size| size <= MAX_DELETE_BATCH));
    assert_eq!(batches.iter().sum::<usize>(), 4500);
}

#[tokio::test]
async fn oversized_pages_are_split_into_batches() {
    let cloud = FakeCloud::new();
    cloud.set_page_size(2500);
    cloud.fill_bucket(BUCKET, 1200, 1);

    let report = purge_bucket(&cloud, BUCKET).await;

    assert!(report.warnings.is_empty());
    assert_eq!(cloud.bucket_len(BUCKET), Some(0));
    assert!(cloud.batch_sizes().iter().all(|&size| size <= MAX_DELETE_BATCH));
}

#[tokio::test]
async fn missing_bucket_is_already_empty() {
    let cloud = FakeCloud::new();

    let report = purge_bucket(&cloud, "gone").await;

    assert_eq!(report.removed, 0);
    assert!(report.warnings.is_empty());
    assert!(cloud.batch_sizes().is_empty());
}

#[tokio::test]
async fn sweeps_every_bucket_a_stack_owns() {
    let cloud = FakeCloud::new();
    let stack = namespace().unit_name("s3");
    cloud.seed_stack(&stack, StackStatus::CreateComplete, &[]);
    cloud.attach_bucket(&stack, "proj-dev-logs");
    cloud.attach_bucket(&stack, "proj-dev-archive");
    cloud.fill_bucket("proj-dev-logs", 10, 1);
    cloud.fill_bucket("proj-dev-archive", 5, 3);

    let report = empty_child_resources(&cloud, &cloud, &stack).await;

    assert!(report.warnings.is_empty());
    assert_eq!(cloud.bucket_len("proj-dev-logs"), Some(0));
    assert_eq!(cloud.bucket_len("proj-dev-archive"), Some(0));
    assert!(report.removed > 0);
}
