//! stackrun-coordinator - CloudFormation environment orchestrator
//!
//! This crate provides the `stackrun` binary and the engine behind it:
//! ordered stack creation with output propagation, bounded polling, reverse
//! teardown with bucket sweeping, and orphan cleanup.

pub mod aws;
pub mod config;
pub mod orchestrator;
pub mod secrets;
pub mod wait;
