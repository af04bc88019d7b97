//! Units (stacks) and the linear plan that orders them
//!
//! A [`StackPlan`] is a fixed chain, not a general DAG: unit *i* may only
//! consume outputs of units *0..i*. Deploy walks it forward, teardown walks the
//! exact reverse.

use crate::naming::Namespace;
use crate::redacted::Redacted;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Elevated-privilege acknowledgements a template may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum Capability {
    #[strum(serialize = "CAPABILITY_IAM")]
    Iam,
    #[strum(serialize = "CAPABILITY_NAMED_IAM")]
    NamedIam,
    #[strum(serialize = "CAPABILITY_AUTO_EXPAND")]
    AutoExpand,
}

/// Where a stack parameter gets its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSource {
    /// Fixed value known before the run
    Literal(String),
    /// Fixed value that must never be logged
    Secret(Redacted),
    /// Output of an earlier unit, with an account export as fallback
    Upstream {
        /// Role of the producing unit
        role: String,
        /// Output key on the producing stack
        key: String,
        /// Export name to fall back to; defaults to `{unit_name}-{key}`
        export: Option<String>,
        /// Fail the run when the value cannot be found
        required: bool,
    },
}

impl ParameterSource {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Required upstream output
    pub fn output(role: &str, key: &str) -> Self {
        Self::Upstream {
            role: role.to_string(),
            key: key.to_string(),
            export: None,
            required: true,
        }
    }

    /// Upstream output that may be absent (cosmetic values)
    pub fn optional_output(role: &str, key: &str) -> Self {
        Self::Upstream {
            role: role.to_string(),
            key: key.to_string(),
            export: None,
            required: false,
        }
    }
}

/// A named, independently provisionable stack
#[derive(Debug, Clone)]
pub struct Unit {
    /// Short role name within the plan (vpc, s3, ...)
    pub role: String,
    /// Globally unique stack name
    pub name: String,
    /// Template file
    pub template: PathBuf,
    /// Ordered parameter bindings
    pub parameters: Vec<(String, ParameterSource)>,
    pub capabilities: Vec<Capability>,
    /// Purge owned buckets before deleting this stack
    pub sweep: bool,
}

impl Unit {
    pub fn new(namespace: &Namespace, role: &str, template: impl Into<PathBuf>) -> Self {
        Self {
            role: role.to_string(),
            name: namespace.unit_name(role),
            template: template.into(),
            parameters: Vec::new(),
            capabilities: Vec::new(),
            sweep: false,
        }
    }

    pub fn param(mut self, name: &str, source: ParameterSource) -> Self {
        self.parameters.push((name.to_string(), source));
        self
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn sweep_before_delete(mut self) -> Self {
        self.sweep = true;
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("duplicate unit name '{0}'")]
    DuplicateName(String),

    #[error("unit '{unit}' parameter '{parameter}' depends on '{role}', which is not an earlier unit")]
    ForwardReference {
        unit: String,
        parameter: String,
        role: String,
    },
}

/// Ordered deployment plan
#[derive(Debug, Clone)]
pub struct StackPlan {
    units: Vec<Unit>,
}

impl StackPlan {
    /// Build a plan, checking name uniqueness and that every upstream
    /// reference points strictly backwards.
    pub fn new(units: Vec<Unit>) -> Result<Self, PlanError> {
        let mut names = HashSet::new();
        let mut earlier_roles: HashSet<&str> = HashSet::new();

        for unit in &units {
            if !names.insert(unit.name.as_str()) {
                return Err(PlanError::DuplicateName(unit.name.clone()));
            }
            for (parameter, source) in &unit.parameters {
                if let ParameterSource::Upstream { role, .. } = source {
                    if !earlier_roles.contains(role.as_str()) {
                        return Err(PlanError::ForwardReference {
                            unit: unit.name.clone(),
                            parameter: parameter.clone(),
                            role: role.clone(),
                        });
                    }
                }
            }
            earlier_roles.insert(unit.role.as_str());
        }

        Ok(Self { units })
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Producer before consumer
    pub fn deploy_order(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Consumers before producers: the structural reverse of `deploy_order`
    pub fn teardown_order(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().rev()
    }
}
