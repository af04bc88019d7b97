//! Terminal-state poller for stack operations

use super::types::OrchestratorError;
use crate::aws::cloudformation::{StackEvent, StackOperations};
use crate::config::PollConfig;
use crate::wait::{Probe, WaitError, wait_for};
use stackrun_common::{StackStatus, StatusClass};
use std::cell::RefCell;
use tokio::time::Instant;
use tracing::{info, warn};

/// Which terminal state the caller is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Awaiting {
    /// Create (or an in-flight create/update) finishing
    Provision,
    /// Delete finishing; a vanished stack counts as `DELETE_COMPLETE`
    Removal,
}

/// What one status observation means for the wait
enum Observation {
    Done(StackStatus),
    Failed(StackStatus),
    Pending,
}

fn interpret(awaiting: Awaiting, status: Option<&StackStatus>) -> Observation {
    match (awaiting, status) {
        // Newly created stacks may not be visible yet
        (Awaiting::Provision, None) => Observation::Pending,
        (Awaiting::Provision, Some(status)) => match status.class() {
            StatusClass::Succeeded => Observation::Done(status.clone()),
            StatusClass::Failed => Observation::Failed(status.clone()),
            StatusClass::InProgress => Observation::Pending,
        },
        (Awaiting::Removal, None) => Observation::Done(StackStatus::DeleteComplete),
        (Awaiting::Removal, Some(StackStatus::DeleteComplete)) => {
            Observation::Done(StackStatus::DeleteComplete)
        }
        (Awaiting::Removal, Some(StackStatus::DeleteFailed)) => {
            Observation::Failed(StackStatus::DeleteFailed)
        }
        // Right after DeleteStack the old status may still be reported
        (Awaiting::Removal, Some(_)) => Observation::Pending,
    }
}

/// Most recent events for diagnostics; failures here never mask the real error
pub(crate) async fn recent_events<S: StackOperations>(
    stacks: &S,
    unit_name: &str,
    limit: usize,
) -> Vec<StackEvent> {
    match stacks.list_events(unit_name, limit).await {
        Ok(events) => events,
        Err(e) => {
            warn!(stack = %unit_name, error = ?e, "Failed to fetch stack events");
            Vec::new()
        }
    }
}

/// Poll a stack until it reaches the terminal state `awaiting` asks for.
///
/// Returns the terminal success status, `OperationFailed` with the latest
/// events on a failure status, or `Timeout` once `poll.max_wait` has elapsed.
pub async fn await_terminal<S: StackOperations>(
    stacks: &S,
    unit_name: &str,
    awaiting: Awaiting,
    poll: &PollConfig,
) -> Result<StackStatus, OrchestratorError> {
    let start = Instant::now();
    let last_status: RefCell<Option<StackStatus>> = RefCell::new(None);

    let outcome = wait_for(poll.wait_config(), unit_name, || {
        let last_status = &last_status;
        async move {
            let description = stacks.describe_stack(unit_name).await?;
            let status = description.map(|d| d.status);

            info!(
                stack = %unit_name,
                status = %status.as_ref().map(|s| s.as_str()).unwrap_or("NOT_FOUND"),
                elapsed_secs = start.elapsed().as_secs(),
                "Polling stack"
            );

            let observation = interpret(awaiting, status.as_ref());
            *last_status.borrow_mut() = status;

            Ok::<_, anyhow::Error>(match observation {
                Observation::Done(status) => Probe::Ready(Ok(status)),
                Observation::Failed(status) => Probe::Ready(Err(status)),
                Observation::Pending => Probe::Pending,
            })
        }
    })
    .await;

    match outcome {
        Ok(Ok(status)) => Ok(status),
        Ok(Err(status)) => {
            let events = recent_events(stacks, unit_name, poll.event_limit).await;
            Err(OrchestratorError::OperationFailed {
                unit: unit_name.to_string(),
                status,
                events,
            })
        }
        Err(WaitError::Timeout { elapsed, attempts }) => {
            warn!(stack = %unit_name, elapsed_secs = elapsed.as_secs(), attempts, "Stack wait timed out");
            let events = recent_events(stacks, unit_name, poll.event_limit).await;
            Err(OrchestratorError::Timeout {
                unit: unit_name.to_string(),
                waited: elapsed,
                last_status: last_status.into_inner(),
                events,
            })
        }
        Err(WaitError::Check(e)) => Err(OrchestratorError::Remote(e)),
    }
}
