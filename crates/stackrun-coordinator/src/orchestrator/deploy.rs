//! Deploy path: walk the plan forward, one unit at a time
//!
//! Each unit's parameters are resolved from the outputs of the units before
//! it, the guard brings it to a complete state, and its outputs are recorded
//! for the next unit. The first error stops the run.

use super::guard::ensure_created;
use super::outputs::{ExportTable, resolve_parameters};
use super::package::{Artifact, publish_artifacts};
use super::types::{DeployPhase, DeploySummary, GuardOutcome, Highlight, OrchestratorError, UnitReport};
use crate::aws::{BucketOperations, StackOperations};
use crate::config::PollConfig;
use stackrun_common::{Namespace, StackPlan, Unit};
use tracing::{error, info, instrument};

/// Artifacts to upload before the first unit
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub bucket: String,
    pub artifacts: Vec<Artifact>,
}

/// Output worth showing the operator once the run is done
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpec {
    pub label: String,
    pub role: String,
    pub key: String,
}

impl HighlightSpec {
    pub fn new(label: &str, role: &str, key: &str) -> Self {
        Self {
            label: label.to_string(),
            role: role.to_string(),
            key: key.to_string(),
        }
    }
}

/// Everything needed to deploy or tear down one environment
#[derive(Debug, Clone)]
pub struct Deployment {
    pub namespace: Namespace,
    pub plan: StackPlan,
    pub artifacts: Option<ArtifactSet>,
    pub highlights: Vec<HighlightSpec>,
}

/// Deploy every unit of the plan in order.
///
/// Re-running against a partially or fully deployed environment is safe:
/// complete units are skipped and in-flight ones are awaited.
#[instrument(skip_all, fields(namespace = %deployment.namespace))]
pub async fn deploy<S, B>(
    stacks: &S,
    buckets: &B,
    deployment: &Deployment,
    poll: &PollConfig,
) -> Result<DeploySummary, OrchestratorError>
where
    S: StackOperations,
    B: BucketOperations,
{
    let plan = &deployment.plan;
    let mut phase = DeployPhase::NotStarted;
    info!(units = plan.len(), phase = ?phase, "Starting deploy");

    if let Some(set) = &deployment.artifacts {
        let published = publish_artifacts(buckets, &set.bucket, &set.artifacts).await?;
        info!(bucket = %set.bucket, count = published.len(), "Artifacts published");
    }

    let mut table = ExportTable::new();
    let mut units = Vec::with_capacity(plan.len());

    for (index, unit) in plan.deploy_order().enumerate() {
        phase = DeployPhase::PerUnit(index);
        info!(stack = %unit.name, phase = ?phase, "Deploying unit");

        match deploy_unit(stacks, &deployment.namespace, unit, &mut table, poll).await {
            Ok(outcome) => {
                info!(
                    stack = %unit.name,
                    outcome = outcome.label(),
                    status = %outcome.status(),
                    "Unit ready"
                );
                units.push(UnitReport {
                    role: unit.role.clone(),
                    name: unit.name.clone(),
                    outcome: outcome.label().to_string(),
                    status: outcome.status().to_string(),
                });
            }
            Err(e) => {
                phase = DeployPhase::Failed(index);
                error!(stack = %unit.name, phase = ?phase, "Deploy halted:\n{}", e.detailed());
                return Err(e);
            }
        }
    }

    phase = DeployPhase::Done;
    let highlights = collect_highlights(&deployment.namespace, &deployment.highlights, &table);
    let summary = DeploySummary {
        namespace: deployment.namespace.prefix(),
        phase,
        units,
        highlights,
        artifact_bucket: deployment.artifacts.as_ref().map(|a| a.bucket.clone()),
    };
    info!(
        created = summary.created_count(),
        units = summary.units.len(),
        "Deploy complete"
    );
    Ok(summary)
}

async fn deploy_unit<S: StackOperations>(
    stacks: &S,
    namespace: &Namespace,
    unit: &Unit,
    table: &mut ExportTable,
    poll: &PollConfig,
) -> Result<GuardOutcome, OrchestratorError> {
    let parameters = resolve_parameters(unit, table, |role| namespace.unit_name(role))?;
    let outcome = ensure_created(stacks, namespace, unit, parameters, poll).await?;

    let description = stacks.describe_stack(&unit.name).await?.ok_or_else(|| {
        OrchestratorError::Remote(anyhow::anyhow!(
            "{} reached {} but is no longer visible",
            unit.name,
            outcome.status()
        ))
    })?;
    table.record_outputs(&description);
    table.refresh_exports(stacks).await?;

    Ok(outcome)
}

fn collect_highlights(
    namespace: &Namespace,
    specs: &[HighlightSpec],
    table: &ExportTable,
) -> Vec<Highlight> {
    specs
        .iter()
        .filter_map(|spec| {
            let value = table
                .resolve_output(&namespace.unit_name(&spec.role), &spec.key)
                .ok()?;
            Some(Highlight {
                label: spec.label.clone(),
                value: value.to_string(),
            })
        })
        .collect()
}
