//! Existence and idempotency guard
//!
//! Decides, per unit, whether to create, wait for an in-flight operation,
//! skip, or refuse. A unit in a failed state is never deleted or recreated
//! automatically.

use super::poller::{Awaiting, await_terminal, recent_events};
use super::types::{GuardOutcome, OrchestratorError};
use crate::aws::cloudformation::{
    CreateStackRequest, ResolvedParameter, StackOperations, TemplateValidation,
};
use crate::config::PollConfig;
use stackrun_common::defaults::MAX_TEMPLATE_BODY_BYTES;
use stackrun_common::naming::Namespace;
use stackrun_common::{StatusClass, Unit};
use tracing::{info, warn};

/// Read and check a unit's template, locally then remotely
pub async fn validate_definition<S: StackOperations>(
    stacks: &S,
    unit: &Unit,
) -> Result<String, OrchestratorError> {
    let invalid = |reason: String| OrchestratorError::DefinitionInvalid {
        unit: unit.name.clone(),
        reason,
    };

    let body = tokio::fs::read_to_string(&unit.template)
        .await
        .map_err(|e| invalid(format!("cannot read {}: {e}", unit.template.display())))?;

    if body.trim().is_empty() {
        return Err(invalid(format!("{} is empty", unit.template.display())));
    }
    if body.len() > MAX_TEMPLATE_BODY_BYTES {
        return Err(invalid(format!(
            "{} is {} bytes, over the {MAX_TEMPLATE_BODY_BYTES} byte inline limit",
            unit.template.display(),
            body.len()
        )));
    }

    match stacks.validate_template(&body).await? {
        TemplateValidation::Valid => Ok(body),
        TemplateValidation::Invalid(reason) => Err(invalid(reason)),
    }
}

/// Bring `unit` to a successful terminal state, creating it if absent.
pub async fn ensure_created<S: StackOperations>(
    stacks: &S,
    namespace: &Namespace,
    unit: &Unit,
    parameters: Vec<ResolvedParameter>,
    poll: &PollConfig,
) -> Result<GuardOutcome, OrchestratorError> {
    // Validation runs even if the stack turns out to be complete already
    let template_body = validate_definition(stacks, unit).await?;

    if let Some(existing) = stacks.describe_stack(&unit.name).await? {
        let status = existing.status;
        match status.class() {
            StatusClass::Succeeded => {
                info!(stack = %unit.name, status = %status, "Stack already complete, skipping");
                return Ok(GuardOutcome::Skipped(status));
            }
            StatusClass::InProgress if status.is_deleting() => {
                info!(stack = %unit.name, "Stack is being deleted, waiting before re-creating");
                await_terminal(stacks, &unit.name, Awaiting::Removal, poll).await?;
            }
            StatusClass::InProgress => {
                info!(stack = %unit.name, status = %status, "Operation in flight, waiting for it");
                let status = await_terminal(stacks, &unit.name, Awaiting::Provision, poll).await?;
                return Ok(GuardOutcome::AwaitedInFlight(status));
            }
            StatusClass::Failed => {
                warn!(stack = %unit.name, status = %status, "Stack is in a failed state");
                let events = recent_events(stacks, &unit.name, poll.event_limit).await;
                return Err(OrchestratorError::ConflictingState {
                    unit: unit.name.clone(),
                    status,
                    events,
                });
            }
        }
    }

    let request = CreateStackRequest {
        name: unit.name.clone(),
        template_body,
        parameters,
        capabilities: unit.capabilities.clone(),
        tags: namespace.stack_tags(&unit.role),
    };
    let stack_id = stacks.create_stack(request).await?;
    info!(stack = %unit.name, stack_id = %stack_id, "Create requested");

    let status = await_terminal(stacks, &unit.name, Awaiting::Provision, poll).await?;
    Ok(GuardOutcome::Created(status))
}
