//! Stack outputs, account exports, and parameter resolution
//!
//! The [`ExportTable`] is filled in as the deploy walks the plan and handed
//! by reference to each later unit. Nothing else holds output state.

use super::types::OrchestratorError;
use crate::aws::cloudformation::{ResolvedParameter, StackDescription, StackOperations};
use anyhow::Result;
use stackrun_common::{ParameterSource, Unit};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Lookup failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("export {0} not found")]
    ExportNotFound(String),
    #[error("output {key} of {unit} not found")]
    OutputNotFound { unit: String, key: String },
}

/// Exports of the account/region plus the outputs of units deployed so far
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    exports: HashMap<String, String>,
    /// unit name -> output key -> value
    outputs: HashMap<String, HashMap<String, String>>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outputs of a completed stack (including any it exports)
    pub fn record_outputs(&mut self, stack: &StackDescription) {
        let outputs = self.outputs.entry(stack.name.clone()).or_default();
        for output in &stack.outputs {
            outputs.insert(output.key.clone(), output.value.clone());
            if let Some(export) = &output.export_name {
                self.exports.insert(export.clone(), output.value.clone());
            }
        }
    }

    /// Reload every account export
    pub async fn refresh_exports<S: StackOperations>(&mut self, stacks: &S) -> Result<()> {
        let exports = stacks.list_exports().await?;
        debug!(count = exports.len(), "Refreshed exports");
        for export in exports {
            self.exports.insert(export.name, export.value);
        }
        Ok(())
    }

    /// Value of an account export
    pub fn resolve(&self, export: &str) -> Result<&str, ResolveError> {
        self.exports
            .get(export)
            .map(String::as_str)
            .ok_or_else(|| ResolveError::ExportNotFound(export.to_string()))
    }

    /// Value of an output of one specific unit
    pub fn resolve_output(&self, unit: &str, key: &str) -> Result<&str, ResolveError> {
        self.outputs
            .get(unit)
            .and_then(|o| o.get(key))
            .map(String::as_str)
            .ok_or_else(|| ResolveError::OutputNotFound {
                unit: unit.to_string(),
                key: key.to_string(),
            })
    }

    /// Output first, then the export fallback
    pub fn lookup(&self, unit: &str, key: &str, export: &str) -> Option<&str> {
        match self.resolve_output(unit, key) {
            Ok(value) => Some(value),
            Err(_) => {
                let value = self.resolve(export).ok();
                if value.is_some() {
                    debug!(unit = %unit, key = %key, export = %export, "Output resolved via export");
                }
                value
            }
        }
    }
}

/// Resolve every parameter of `unit` against the table.
///
/// Missing required values fail with `MissingInput`; missing optional ones
/// are skipped with a warning so the template default applies.
pub fn resolve_parameters(
    unit: &Unit,
    table: &ExportTable,
    unit_name_of: impl Fn(&str) -> String,
) -> Result<Vec<ResolvedParameter>, OrchestratorError> {
    let mut resolved = Vec::with_capacity(unit.parameters.len());

    for (parameter, source) in &unit.parameters {
        match source {
            ParameterSource::Literal(value) => {
                resolved.push(ResolvedParameter::plain(parameter, value));
            }
            ParameterSource::Secret(value) => {
                resolved.push(ResolvedParameter::secret(parameter, value.expose()));
            }
            ParameterSource::Upstream {
                role,
                key,
                export,
                required,
            } => {
                let producer = unit_name_of(role);
                let export = export
                    .clone()
                    .unwrap_or_else(|| format!("{producer}-{key}"));

                match table.lookup(&producer, key, &export) {
                    Some(value) => resolved.push(ResolvedParameter::plain(parameter, value)),
                    None if *required => {
                        return Err(OrchestratorError::MissingInput {
                            unit: unit.name.clone(),
                            parameter: parameter.clone(),
                            wanted: format!("output {key} of {producer} or export {export}"),
                        });
                    }
                    None => {
                        warn!(
                            stack = %unit.name,
                            parameter = %parameter,
                            producer = %producer,
                            key = %key,
                            "Optional input unavailable, using template default"
                        );
                    }
                }
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::cloudformation::StackOutput;
    use stackrun_common::{Namespace, Redacted, StackStatus};

    fn ns() -> Namespace {
        Namespace::new("proj", "dev").unwrap()
    }

    fn vpc_stack() -> StackDescription {
        StackDescription {
            name: "proj-dev-vpc".to_string(),
            stack_id: None,
            status: StackStatus::CreateComplete,
            status_reason: None,
            outputs: vec![
                StackOutput {
                    key: "VpcId".to_string(),
                    value: "vpc-123".to_string(),
                    export_name: Some("proj-dev-vpc-VpcId".to_string()),
                },
                StackOutput {
                    key: "Cidr".to_string(),
                    value: "10.0.0.0/16".to_string(),
                    export_name: None,
                },
            ],
        }
    }

    /// A stack outside the plan that exports one value
    fn exporting(name: &str, key: &str, export: &str, value: &str) -> StackDescription {
        StackDescription {
            name: name.to_string(),
            stack_id: None,
            status: StackStatus::CreateComplete,
            status_reason: None,
            outputs: vec![StackOutput {
                key: key.to_string(),
                value: value.to_string(),
                export_name: Some(export.to_string()),
            }],
        }
    }

    #[test]
    fn resolves_outputs_and_exports() {
        let mut table = ExportTable::new();
        table.record_outputs(&vpc_stack());
        table.record_outputs(&exporting("shared", "KeyArn", "shared-kms-key", "arn:aws:kms:key"));

        assert_eq!(table.resolve_output("proj-dev-vpc", "Cidr"), Ok("10.0.0.0/16"));
        assert_eq!(table.resolve("proj-dev-vpc-VpcId"), Ok("vpc-123"));
        assert_eq!(table.resolve("shared-kms-key"), Ok("arn:aws:kms:key"));
        assert_eq!(
            table.resolve("nope"),
            Err(ResolveError::ExportNotFound("nope".to_string()))
        );
        assert!(matches!(
            table.resolve_output("proj-dev-s3", "BucketName"),
            Err(ResolveError::OutputNotFound { .. })
        ));
    }

    #[test]
    fn lookup_falls_back_to_export() {
        let mut table = ExportTable::new();
        table.record_outputs(&exporting(
            "legacy-iam",
            "Role",
            "proj-dev-iam-RoleArn",
            "arn:aws:iam::1:role/r",
        ));
        assert_eq!(
            table.lookup("proj-dev-iam", "RoleArn", "proj-dev-iam-RoleArn"),
            Some("arn:aws:iam::1:role/r")
        );
        assert_eq!(table.lookup("proj-dev-iam", "Other", "proj-dev-iam-Other"), None);
    }

    #[test]
    fn required_input_missing_fails() {
        let ns = ns();
        let unit = Unit::new(&ns, "ec2", "templates/ec2.yaml")
            .param("SubnetId", ParameterSource::output("vpc", "SubnetId"));

        let err = resolve_parameters(&unit, &ExportTable::new(), |r| ns.unit_name(r)).unwrap_err();
        match err {
            OrchestratorError::MissingInput {
                unit, parameter, ..
            } => {
                assert_eq!(unit, "proj-dev-ec2");
                assert_eq!(parameter, "SubnetId");
            }
            other => panic!("expected MissingInput, got {other:?}"),
        }
    }

    #[test]
    fn optional_input_missing_is_omitted() {
        let ns = ns();
        let unit = Unit::new(&ns, "dashboard", "templates/dashboard.yaml")
            .param("Title", ParameterSource::literal("Overview"))
            .param("DbId", ParameterSource::optional_output("rds", "DbInstanceId"));

        let params = resolve_parameters(&unit, &ExportTable::new(), |r| ns.unit_name(r)).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].key, "Title");
    }

    #[test]
    fn secrets_stay_hidden_in_debug() {
        let ns = ns();
        let mut table = ExportTable::new();
        table.record_outputs(&vpc_stack());
        let unit = Unit::new(&ns, "rds", "templates/rds.yaml")
            .param("VpcId", ParameterSource::output("vpc", "VpcId"))
            .param("DbPassword", ParameterSource::Secret(Redacted::new("hunter2")));

        let params = resolve_parameters(&unit, &table, |r| ns.unit_name(r)).unwrap();
        assert_eq!(params[0].value(), "vpc-123");
        assert_eq!(params[1].value(), "hunter2");
        assert!(params[1].is_secret());
        assert!(!format!("{params:?}").contains("hunter2"));
    }
}
