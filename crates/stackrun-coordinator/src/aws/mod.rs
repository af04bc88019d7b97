//! AWS client modules for the orchestrator
//!
//! This module provides wrappers around AWS SDK clients for:
//! - CloudFormation: stack lifecycle, outputs, exports, events
//! - S3: artifact upload and versioned bucket purging
//! - CloudWatch / SNS / CloudWatch Logs: orphan discovery and deletion
//! - STS: account ID lookup
//!
//! Each client has a matching `*Operations` trait; the orchestrator is generic
//! over those traits so it can run against fakes in tests.

pub mod account;
pub mod cloudformation;
pub mod context;
pub mod error;
mod field;
pub mod monitoring;
pub mod s3;

// Core clients
pub use account::{AccountId, get_current_account_id};
pub use cloudformation::{CloudFormationClient, StackOperations};
pub use context::{AwsContext, FromAwsContext};
pub use monitoring::{MonitoringClient, OrphanOperations};
pub use s3::{BucketOperations, S3Client};

// Error handling
pub use error::{AwsError, classify_anyhow_error, classify_aws_error, classify_sdk_error};
