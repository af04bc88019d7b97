//! Stack orchestration engine
//!
//! Deploys a [`StackPlan`](stackrun_common::StackPlan) forward and tears it
//! down in reverse. Generic over the AWS operation traits so the state
//! machines run unchanged against test fakes.
//!
//! - [`poller`]: wait for a stack operation to reach a terminal state
//! - [`guard`]: create, await, skip, or refuse a unit
//! - [`outputs`]: outputs/exports table and parameter resolution
//! - [`deploy`]: forward walk
//! - [`sweeper`]: empty versioned buckets before deletion
//! - [`teardown`]: reverse walk, orphans, artifact bucket
//! - [`orphans`]: prefix-matched alarms, topics, log groups
//! - [`environment`]: the concrete eight-stack plan
//! - [`package`]: zip and upload artifacts

pub mod deploy;
pub mod environment;
pub mod guard;
pub mod orphans;
pub mod outputs;
pub mod package;
pub mod poller;
pub mod sweeper;
pub mod teardown;
pub mod types;

pub use deploy::{ArtifactSet, Deployment, HighlightSpec, deploy};
pub use guard::ensure_created;
pub use orphans::cleanup_orphans;
pub use outputs::{ExportTable, ResolveError, resolve_parameters};
pub use package::{Artifact, PublishedArtifact, artifact_bucket_name, publish_artifacts};
pub use poller::{Awaiting, await_terminal};
pub use sweeper::{empty_child_resources, purge_bucket};
pub use teardown::teardown;
pub use types::{
    DeployPhase, DeploySummary, GuardOutcome, Highlight, OrchestratorError, OrphanReport,
    SweepReport, SweepWarning, TeardownOutcome, TeardownReport, TeardownUnit, UnitReport,
};
