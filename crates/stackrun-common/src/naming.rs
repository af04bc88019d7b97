//! Deployment namespace: stack naming, prefix ownership and stack tags
//!
//! Every resource stackrun creates is named `{project}-{environment}-{role}`.
//! The `{project}-{environment}` prefix is the only join key between a deploy
//! run and a later teardown, and is what the orphan scan matches against.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `stackrun:project` | Project name |
//! | `stackrun:environment` | Environment name (dev, staging, ...) |
//! | `stackrun:role` | Role of the stack within the plan (vpc, s3, ...) |
//! | `stackrun:created-at` | RFC 3339 creation timestamp |

use std::fmt;
use thiserror::Error;

/// Tag key for the project name
pub const TAG_PROJECT: &str = "stackrun:project";

/// Tag key for the environment name
pub const TAG_ENVIRONMENT: &str = "stackrun:environment";

/// Tag key for the stack role
pub const TAG_ROLE: &str = "stackrun:role";

/// Tag key for creation timestamp (RFC 3339 format)
pub const TAG_CREATED_AT: &str = "stackrun:created-at";

/// Maximum CloudFormation stack name length
const MAX_STACK_NAME_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamespaceError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} '{value}' must start with a lowercase letter")]
    BadStart { field: &'static str, value: String },

    #[error("{field} '{value}' may only contain lowercase letters, digits and '-'")]
    BadCharacter { field: &'static str, value: String },

    #[error("prefix '{0}' is too long for a stack name")]
    TooLong(String),
}

/// Project/environment pair that scopes one deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    project: String,
    environment: String,
}

impl Namespace {
    /// Validate and build a namespace.
    ///
    /// Names are restricted to what is legal in both stack names and S3
    /// bucket names.
    pub fn new(project: &str, environment: &str) -> Result<Self, NamespaceError> {
        validate_segment("project name", project)?;
        validate_segment("environment", environment)?;

        let ns = Self {
            project: project.to_string(),
            environment: environment.to_string(),
        };
        // Leave room for "-{role}"
        if ns.prefix().len() > MAX_STACK_NAME_LEN - 32 {
            return Err(NamespaceError::TooLong(ns.prefix()));
        }
        Ok(ns)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// `{project}-{environment}`
    pub fn prefix(&self) -> String {
        format!("{}-{}", self.project, self.environment)
    }

    /// `{project}-{environment}-{role}`
    pub fn unit_name(&self, role: &str) -> String {
        format!("{}-{}", self.prefix(), role)
    }

    /// Whether a resource name belongs to this namespace.
    ///
    /// A `/` or `:` separated segment of the resource name must equal the
    /// prefix or start with `{prefix}-`. This covers plain names
    /// (`proj-dev-cpu-high`), ARNs (`arn:aws:sns:...:proj-dev-alerts`) and log
    /// group paths (`/aws/lambda/proj-dev-logger`), while rejecting
    /// `proj-development-x` for prefix `proj-dev`. The partition, service,
    /// region and account fields of an ARN never count.
    pub fn owns(&self, name: &str) -> bool {
        let prefix = self.prefix();
        let dashed = format!("{prefix}-");
        resource_part(name)
            .split(['/', ':'])
            .any(|segment| segment == prefix || segment.starts_with(&dashed))
    }

    /// Standard tags for a stack of the given role
    pub fn stack_tags(&self, role: &str) -> Vec<(String, String)> {
        vec![
            (TAG_PROJECT.to_string(), self.project.clone()),
            (TAG_ENVIRONMENT.to_string(), self.environment.clone()),
            (TAG_ROLE.to_string(), role.to_string()),
            (
                TAG_CREATED_AT.to_string(),
                format_created_at(chrono::Utc::now()),
            ),
        ]
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix())
    }
}

fn validate_segment(field: &'static str, value: &str) -> Result<(), NamespaceError> {
    let Some(first) = value.chars().next() else {
        return Err(NamespaceError::Empty { field });
    };
    if !first.is_ascii_lowercase() {
        return Err(NamespaceError::BadStart {
            field,
            value: value.to_string(),
        });
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(NamespaceError::BadCharacter {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Strip the `arn:partition:service:region:account:` header, if any
fn resource_part(name: &str) -> &str {
    match name.strip_prefix("arn:") {
        Some(rest) => rest.splitn(5, ':').nth(4).unwrap_or_default(),
        None => name,
    }
}

/// Helper to format creation timestamp for tags
pub fn format_created_at(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> Namespace {
        Namespace::new("proj", "dev").unwrap()
    }

    #[test]
    fn builds_names_from_prefix() {
        let ns = ns();
        assert_eq!(ns.prefix(), "proj-dev");
        assert_eq!(ns.unit_name("vpc"), "proj-dev-vpc");
        assert_eq!(ns.to_string(), "proj-dev");
    }

    #[test]
    fn owns_matching_names() {
        let ns = ns();
        assert!(ns.owns("proj-dev-cpu-high"));
        assert!(ns.owns("proj-dev"));
        assert!(ns.owns("arn:aws:sns:us-east-1:123456789012:proj-dev-alerts"));
        assert!(ns.owns("/aws/lambda/proj-dev-ec2-status-logger"));
    }

    #[test]
    fn ignores_other_namespaces() {
        let ns = ns();
        assert!(!ns.owns("other-dev-cpu-high"));
        assert!(!ns.owns("proj-development-cpu-high"));
        assert!(!ns.owns("/aws/lambda/other-dev-logger"));
        assert!(!ns.owns("xproj-dev-alarm"));
    }

    #[test]
    fn arn_header_fields_are_not_names() {
        let ns = Namespace::new("us", "east").unwrap();
        assert!(!ns.owns("arn:aws:sns:us-east-1:123456789012:billing-alerts"));
        assert!(!ns.owns("arn:aws:sns:us-east"));
        assert!(ns.owns("arn:aws:sns:us-east-1:123456789012:us-east-alerts"));
        assert!(ns.owns(
            "arn:aws:logs:us-east-1:123456789012:log-group:/aws/lambda/us-east-fn:*"
        ));
    }

    #[test]
    fn rejects_invalid_segments() {
        assert_eq!(
            Namespace::new("", "dev"),
            Err(NamespaceError::Empty {
                field: "project name"
            })
        );
        assert!(matches!(
            Namespace::new("Proj", "dev"),
            Err(NamespaceError::BadStart { .. })
        ));
        assert!(matches!(
            Namespace::new("proj", "dev_1"),
            Err(NamespaceError::BadCharacter { .. })
        ));
        assert!(matches!(
            Namespace::new(&"a".repeat(100), "dev"),
            Err(NamespaceError::TooLong(_))
        ));
    }

    #[test]
    fn stack_tags_include_role() {
        let tags = ns().stack_tags("rds");
        assert!(tags.contains(&(TAG_ROLE.to_string(), "rds".to_string())));
        assert!(tags.contains(&(TAG_PROJECT.to_string(), "proj".to_string())));
        let created = tags
            .iter()
            .find(|(k, _)| k == TAG_CREATED_AT)
            .map(|(_, v)| v.as_str())
            .unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
    }
}
