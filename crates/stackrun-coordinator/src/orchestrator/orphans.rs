//! Best-effort removal of leftovers matching the deployment prefix

use super::types::OrphanReport;
use crate::aws::OrphanOperations;
use stackrun_common::{Namespace, OrphanKind};
use tracing::{info, warn};

/// Delete alarms, topics, and log groups the namespace owns.
///
/// Every kind is attempted; failures are recorded, never returned.
pub async fn cleanup_orphans<O: OrphanOperations>(
    monitoring: &O,
    namespace: &Namespace,
) -> OrphanReport {
    let mut report = OrphanReport::default();

    for kind in OrphanKind::in_cleanup_order() {
        let names = match monitoring.list_names(kind).await {
            Ok(names) => names,
            Err(e) => {
                warn!(kind = %kind, error = ?e, "Failed to list resources");
                report.warnings.push(format!("listing {kind}s failed: {e:#}"));
                continue;
            }
        };

        let owned: Vec<String> = names.into_iter().filter(|n| namespace.owns(n)).collect();
        if owned.is_empty() {
            continue;
        }
        info!(kind = %kind, count = owned.len(), prefix = %namespace.prefix(), "Found orphans");

        for name in owned {
            match monitoring.delete(kind, &name).await {
                Ok(()) => report.deleted.push((kind, name)),
                Err(e) => {
                    warn!(kind = %kind, name = %name, error = ?e, "Failed to delete orphan");
                    report.warnings.push(format!("deleting {kind} {name} failed: {e:#}"));
                }
            }
        }
    }

    report
}
