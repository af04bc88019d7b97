//! Configuration types for the coordinator

use crate::wait::WaitConfig;
use stackrun_common::defaults::{
    DEFAULT_CPU_THRESHOLD, DEFAULT_EVENT_LIMIT, DEFAULT_LAMBDA_SOURCE, DEFAULT_MAX_WAIT_SECS,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REGION, DEFAULT_TEMPLATES_DIR,
};
use stackrun_common::{Namespace, Redacted};
use std::path::PathBuf;
use std::time::Duration;

/// AWS connection settings
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            aws_profile: None,
        }
    }
}

/// Where the stack definitions and artifacts live
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub namespace: Namespace,
    /// Directory holding `{role}.yaml` templates
    pub templates_dir: PathBuf,
    /// Lambda source file or directory, zipped and uploaded before deploy
    pub lambda_source: PathBuf,
}

impl EnvironmentConfig {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            lambda_source: PathBuf::from(DEFAULT_LAMBDA_SOURCE),
        }
    }
}

/// Database credentials
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub username: String,
    /// Never logged; `Debug` prints `[redacted]`
    pub password: Redacted,
}

/// Alarm and notification settings
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Alarm notification address
    pub sns_email: String,
    /// Enable 1-minute EC2 metrics
    pub detailed_monitoring: bool,
    /// CPU alarm threshold in percent (1..=100)
    pub cpu_threshold: u8,
}

impl MonitoringConfig {
    pub fn new(sns_email: impl Into<String>) -> Self {
        Self {
            sns_email: sns_email.into(),
            detailed_monitoring: false,
            cpu_threshold: DEFAULT_CPU_THRESHOLD,
        }
    }
}

/// Polling cadence and budget for stack operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between status checks
    pub interval: Duration,
    /// Budget per stack operation
    pub max_wait: Duration,
    /// Events attached to failure diagnostics
    pub event_limit: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_wait: Duration::from_secs(DEFAULT_MAX_WAIT_SECS),
            event_limit: DEFAULT_EVENT_LIMIT,
        }
    }
}

impl PollConfig {
    pub fn from_secs(interval: u64, max_wait: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval),
            max_wait: Duration::from_secs(max_wait),
            ..Default::default()
        }
    }

    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig::new(self.interval, self.max_wait)
    }
}

/// Configuration for a deploy run
///
/// Composed of focused sub-configs for organization.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub aws: AwsConfig,
    pub environment: EnvironmentConfig,
    pub database: DatabaseConfig,
    pub monitoring: MonitoringConfig,
    pub poll: PollConfig,
    /// Write the deploy summary as JSON to this path
    pub output: Option<PathBuf>,
}

impl DeployConfig {
    pub fn region(&self) -> &str {
        &self.aws.region
    }
    pub fn aws_profile(&self) -> Option<&str> {
        self.aws.aws_profile.as_deref()
    }
    pub fn namespace(&self) -> &Namespace {
        &self.environment.namespace
    }
}

/// Configuration for a cleanup run
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub aws: AwsConfig,
    pub namespace: Namespace,
    pub poll: PollConfig,
}

impl CleanupConfig {
    pub fn region(&self) -> &str {
        &self.aws.region
    }
    pub fn aws_profile(&self) -> Option<&str> {
        self.aws.aws_profile.as_deref()
    }
}
