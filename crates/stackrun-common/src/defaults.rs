//! Default configuration values
//!
//! These constants keep the CLI, the orchestrator and the tests in agreement.

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default seconds between stack status checks
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Default overall wait per stack operation (1 hour; RDS is slow)
pub const DEFAULT_MAX_WAIT_SECS: u64 = 3600;

/// Number of stack events attached to failure diagnostics
pub const DEFAULT_EVENT_LIMIT: usize = 10;

/// S3 DeleteObjects accepts at most this many keys per request
pub const MAX_DELETE_BATCH: usize = 1000;

/// CloudFormation TemplateBody size limit in bytes
pub const MAX_TEMPLATE_BODY_BYTES: usize = 51_200;

/// Default CPU alarm threshold (percent)
pub const DEFAULT_CPU_THRESHOLD: u8 = 70;

/// Default directory holding one template per role
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Default path of the Lambda function sources
pub const DEFAULT_LAMBDA_SOURCE: &str = "lambda";
