//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use thiserror::Error;

/// AWS error categories for idempotency and cleanup logic
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (safe to skip in cleanup)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Resource already exists (safe to ignore in create operations)
    #[error("Resource already exists")]
    AlreadyExists,

    /// Request was rejected as malformed (e.g. an invalid template)
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if this is an "already exists" error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AwsError::ValidationFailed { .. })
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchBucket",
    "NoSuchKey",
    "ResourceNotFound",
    "ResourceNotFoundException",
    "NotFound",
];

/// Known AWS error codes for "already exists" conditions
const ALREADY_EXISTS_CODES: &[&str] = &[
    "AlreadyExistsException",
    "BucketAlreadyOwnedByYou",
    "ResourceAlreadyExistsException",
];

/// CloudFormation reports every client-side problem as `ValidationError`,
/// including a stack that does not exist.
const VALIDATION_CODES: &[&str] = &["ValidationError", "ValidationException"];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => AwsError::AlreadyExists,
        Some(c) if VALIDATION_CODES.contains(&c) && message.contains("does not exist") => {
            AwsError::NotFound { message }
        }
        Some(c) if VALIDATION_CODES.contains(&c) => AwsError::ValidationFailed { message },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify any SDK error (or operation error) that exposes error metadata.
pub fn classify_sdk_error<E: ProvideErrorMetadata>(error: &E) -> AwsError {
    classify_aws_error(error.code(), error.message())
}

/// Classify an error from an anyhow::Error by extracting the AWS error code.
///
/// Walks the error chain looking for the SDK errors this crate produces, then
/// falls back to scanning the Debug representation for a known code.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    use aws_sdk_cloudformation::operation as cfn;
    use aws_sdk_s3::operation as s3;

    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<aws_sdk_cloudformation::error::SdkError<
            cfn::describe_stacks::DescribeStacksError,
        >>() {
            return classify_sdk_error(e);
        }
        if let Some(e) = cause.downcast_ref::<aws_sdk_cloudformation::error::SdkError<
            cfn::delete_stack::DeleteStackError,
        >>() {
            return classify_sdk_error(e);
        }
        if let Some(e) = cause.downcast_ref::<aws_sdk_cloudformation::error::SdkError<
            cfn::create_stack::CreateStackError,
        >>() {
            return classify_sdk_error(e);
        }
        if let Some(e) = cause
            .downcast_ref::<aws_sdk_s3::error::SdkError<s3::list_objects_v2::ListObjectsV2Error>>()
        {
            return classify_sdk_error(e);
        }
        if let Some(e) = cause.downcast_ref::<aws_sdk_s3::error::SdkError<
            s3::list_object_versions::ListObjectVersionsError,
        >>() {
            return classify_sdk_error(e);
        }
        if let Some(e) = cause
            .downcast_ref::<aws_sdk_s3::error::SdkError<s3::delete_bucket::DeleteBucketError>>()
        {
            return classify_sdk_error(e);
        }
        if let Some(e) = cause
            .downcast_ref::<aws_sdk_s3::error::SdkError<s3::create_bucket::CreateBucketError>>()
        {
            return classify_sdk_error(e);
        }
    }

    // Fallback: extract error code from debug string representation
    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&debug_str));
    }

    AwsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Extract an AWS error code from a debug string representation
fn extract_error_code(debug_str: &str) -> Option<String> {
    let known = NOT_FOUND_CODES.iter().chain(ALREADY_EXISTS_CODES);
    // Longest first so "ResourceNotFoundException" wins over "NotFound"
    let mut known: Vec<&str> = known.copied().collect();
    known.sort_by_key(|c| std::cmp::Reverse(c.len()));

    if let Some(code) = known.into_iter().find(|code| debug_str.contains(code)) {
        return Some(code.to_string());
    }

    // Try to extract any code from `code: Some("...")` pattern
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}
