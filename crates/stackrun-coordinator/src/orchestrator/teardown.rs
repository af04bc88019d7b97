//! Teardown path: delete units in reverse order, then clean up leftovers
//!
//! Teardown never aborts early. Each unit's failure is recorded and the walk
//! continues, so as much as possible is reclaimed in one run.

use super::deploy::Deployment;
use super::orphans::cleanup_orphans;
use super::poller::{Awaiting, await_terminal};
use super::sweeper::{empty_child_resources, purge_bucket};
use super::types::{OrchestratorError, SweepReport, TeardownOutcome, TeardownReport, TeardownUnit};
use crate::aws::{BucketOperations, OrphanOperations, StackOperations, classify_anyhow_error};
use crate::config::PollConfig;
use stackrun_common::Unit;
use tracing::{error, info, instrument, warn};

/// Tear down every unit of the deployment, then its orphans and artifacts.
#[instrument(skip_all, fields(namespace = %deployment.namespace))]
pub async fn teardown<S, B, O>(
    stacks: &S,
    buckets: &B,
    monitoring: &O,
    deployment: &Deployment,
    poll: &PollConfig,
) -> TeardownReport
where
    S: StackOperations,
    B: BucketOperations,
    O: OrphanOperations,
{
    let mut report = TeardownReport::default();

    for unit in deployment.plan.teardown_order() {
        let outcome = match teardown_unit(stacks, buckets, unit, poll, &mut report.sweep).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(stack = %unit.name, "Teardown of unit failed:\n{}", e.detailed());
                TeardownOutcome::Failed(e.detailed())
            }
        };
        report.units.push(TeardownUnit {
            role: unit.role.clone(),
            name: unit.name.clone(),
            outcome,
        });
    }

    report.orphans = cleanup_orphans(monitoring, &deployment.namespace).await;

    if let Some(set) = &deployment.artifacts {
        remove_artifact_bucket(buckets, &set.bucket, &mut report).await;
    }

    info!(
        deleted = report.deleted_count(),
        failed = report.failed_units().count(),
        orphans = report.orphans.deleted.len(),
        swept = report.sweep.removed,
        "Teardown finished"
    );
    report
}

async fn teardown_unit<S, B>(
    stacks: &S,
    buckets: &B,
    unit: &Unit,
    poll: &PollConfig,
    sweep: &mut SweepReport,
) -> Result<TeardownOutcome, OrchestratorError>
where
    S: StackOperations,
    B: BucketOperations,
{
    let Some(existing) = stacks.describe_stack(&unit.name).await? else {
        info!(stack = %unit.name, "Stack not found, skipping");
        return Ok(TeardownOutcome::NotFound);
    };

    if existing.status.is_deleting() {
        info!(stack = %unit.name, "Deletion already in progress, waiting");
    } else {
        if unit.sweep {
            let swept = empty_child_resources(stacks, buckets, &unit.name).await;
            for warning in &swept.warnings {
                warn!(stack = %unit.name, "Sweep warning: {warning}");
            }
            sweep.merge(swept);
        }
        stacks.delete_stack(&unit.name).await?;
        info!(stack = %unit.name, previous = %existing.status, "Delete requested");
    }

    await_terminal(stacks, &unit.name, Awaiting::Removal, poll).await?;
    info!(stack = %unit.name, "Stack deleted");
    Ok(TeardownOutcome::Deleted)
}

async fn remove_artifact_bucket<B: BucketOperations>(
    buckets: &B,
    bucket: &str,
    report: &mut TeardownReport,
) {
    let purged = purge_bucket(buckets, bucket).await;
    report
        .artifact_warnings
        .extend(purged.warnings.iter().map(ToString::to_string));
    report.sweep.removed += purged.removed;

    match buckets.delete_bucket(bucket).await {
        Ok(()) => info!(bucket = %bucket, "Artifact bucket deleted"),
        Err(e) if classify_anyhow_error(&e).is_not_found() => {}
        Err(e) => {
            warn!(bucket = %bucket, error = ?e, "Failed to delete artifact bucket");
            report
                .artifact_warnings
                .push(format!("deleting {bucket} failed: {e:#}"));
        }
    }
}
