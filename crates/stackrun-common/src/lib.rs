//! stackrun-common - Shared types and utilities
//!
//! Types used by the orchestrator and its tests, without any AWS SDK
//! dependencies.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`naming`]: Deployment namespace, stack names, prefix ownership, tags
//! - [`redacted`]: Secret string wrapper
//! - [`resource_kind`]: Orphan resource kinds and cleanup ordering
//! - [`status`]: Stack status codes and their classification
//! - [`unit`]: Units and the linear stack plan

pub mod defaults;
pub mod naming;
pub mod redacted;
pub mod resource_kind;
pub mod status;
pub mod unit;

// Re-export commonly used types
pub use naming::{Namespace, NamespaceError};
pub use redacted::Redacted;
pub use resource_kind::OrphanKind;
pub use status::{StackStatus, StatusClass};
pub use unit::{Capability, ParameterSource, PlanError, StackPlan, Unit};
