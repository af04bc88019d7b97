//! CloudFormation data types used by the orchestrator

use chrono::{DateTime, Utc};
use stackrun_common::{Capability, StackStatus};
use std::fmt;

/// Snapshot of a stack as returned by DescribeStacks
#[derive(Debug, Clone, PartialEq)]
pub struct StackDescription {
    pub name: String,
    pub stack_id: Option<String>,
    pub status: StackStatus,
    pub status_reason: Option<String>,
    pub outputs: Vec<StackOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
    pub export_name: Option<String>,
}

/// Account/region-wide export published by some stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub value: String,
}

/// One entry of a stack's event history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub logical_id: Option<String>,
    pub resource_type: Option<String>,
    pub resource_status: Option<String>,
    pub physical_id: Option<String>,
    pub reason: Option<String>,
}

impl fmt::Display for StackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{} {} {} {}",
            ts,
            self.resource_status.as_deref().unwrap_or("-"),
            self.logical_id.as_deref().unwrap_or("-"),
            self.resource_type.as_deref().unwrap_or("-"),
        )?;
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

/// Render events one per line, most recent first
pub fn format_events(events: &[StackEvent]) -> String {
    if events.is_empty() {
        return "  (no events)".to_string();
    }
    events
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resource owned by a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildResource {
    pub resource_type: String,
    pub logical_id: String,
    pub physical_id: Option<String>,
}

/// Parameter value ready to send; secret values are hidden from `Debug`
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedParameter {
    pub key: String,
    value: String,
    secret: bool,
}

impl ResolvedParameter {
    pub fn plain(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            secret: false,
        }
    }

    pub fn secret(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            secret: true,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }
}

impl fmt::Debug for ResolvedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.secret { "[redacted]" } else { &self.value };
        write!(f, "{}={}", self.key, value)
    }
}

/// Everything CreateStack needs
#[derive(Debug, Clone)]
pub struct CreateStackRequest {
    pub name: String,
    pub template_body: String,
    pub parameters: Vec<ResolvedParameter>,
    pub capabilities: Vec<Capability>,
    pub tags: Vec<(String, String)>,
}

/// Result of a remote template syntax check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValidation {
    Valid,
    Invalid(String),
}
