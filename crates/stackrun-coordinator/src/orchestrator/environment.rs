//! The eight-stack web environment
//!
//! `vpc, s3, iam, ec2, rds, lambda, cloudwatch, dashboard`, each stack
//! consuming outputs of the ones before it. Templates are read from
//! `{templates_dir}/{role}.yaml`.

use super::deploy::{ArtifactSet, Deployment, HighlightSpec};
use super::package::{Artifact, artifact_bucket_name};
use crate::config::DeployConfig;
use anyhow::{Context, Result};
use stackrun_common::defaults::DEFAULT_TEMPLATES_DIR;
use stackrun_common::{Capability, Namespace, ParameterSource as P, StackPlan, Unit};
use std::path::Path;

/// Deploy order of the environment
pub const ROLES: [&str; 8] = [
    "vpc",
    "s3",
    "iam",
    "ec2",
    "rds",
    "lambda",
    "cloudwatch",
    "dashboard",
];

const LAMBDA_ARTIFACT: &str = "lambda";

/// Values only the deploy path needs
struct Inputs<'a> {
    config: &'a DeployConfig,
    artifact_bucket: &'a str,
    lambda_key: String,
}

fn template(dir: &Path, role: &str) -> std::path::PathBuf {
    dir.join(format!("{role}.yaml"))
}

fn units(namespace: &Namespace, templates_dir: &Path, inputs: Option<&Inputs<'_>>) -> Vec<Unit> {
    let base = |role: &str| {
        Unit::new(namespace, role, template(templates_dir, role))
            .param("ProjectName", P::literal(namespace.project()))
            .param("Environment", P::literal(namespace.environment()))
    };

    let mut vpc = base("vpc");
    let s3 = base("s3").sweep_before_delete();
    let mut iam = base("iam").capability(Capability::NamedIam);
    let mut ec2 = base("ec2");
    let mut rds = base("rds");
    let mut lambda = base("lambda").capability(Capability::Iam);
    let mut cloudwatch = base("cloudwatch");
    let mut dashboard = base("dashboard");

    if let Some(inputs) = inputs {
        let config = inputs.config;
        let monitoring = &config.monitoring;

        vpc = vpc.param("Region", P::literal(config.region()));

        iam = iam
            .param("LogBucketArn", P::output("s3", "LogBucketArn"))
            .param("ArtifactBucketName", P::literal(inputs.artifact_bucket));

        ec2 = ec2
            .param("VpcId", P::output("vpc", "VpcId"))
            .param("PublicSubnetId", P::output("vpc", "PublicSubnetId"))
            .param("InstanceProfileName", P::output("iam", "InstanceProfileName"))
            .param("LogBucketName", P::output("s3", "LogBucketName"))
            .param(
                "DetailedMonitoring",
                P::literal(monitoring.detailed_monitoring.to_string()),
            );

        rds = rds
            .param("VpcId", P::output("vpc", "VpcId"))
            .param("PrivateSubnetIds", P::output("vpc", "PrivateSubnetIds"))
            .param("AppSecurityGroupId", P::output("ec2", "SecurityGroupId"))
            .param("DbUsername", P::literal(&config.database.username))
            .param("DbPassword", P::Secret(config.database.password.clone()));

        lambda = lambda
            .param("ExecutionRoleArn", P::output("iam", "LambdaRoleArn"))
            .param("CodeBucket", P::literal(inputs.artifact_bucket))
            .param("CodeKey", P::literal(&inputs.lambda_key))
            .param("InstanceId", P::output("ec2", "InstanceId"))
            .param("LogBucketName", P::output("s3", "LogBucketName"));

        cloudwatch = cloudwatch
            .param("InstanceId", P::output("ec2", "InstanceId"))
            .param("DbInstanceId", P::output("rds", "DbInstanceId"))
            .param("FunctionName", P::output("lambda", "FunctionName"))
            .param("CpuThreshold", P::literal(monitoring.cpu_threshold.to_string()))
            .param("AlertEmail", P::literal(&monitoring.sns_email));

        // Dashboard widgets for missing sources just render empty
        dashboard = dashboard
            .param("InstanceId", P::output("ec2", "InstanceId"))
            .param("DbInstanceId", P::optional_output("rds", "DbInstanceId"))
            .param("FunctionName", P::optional_output("lambda", "FunctionName"))
            .param("AlarmTopicArn", P::optional_output("cloudwatch", "AlarmTopicArn"));
    }

    vec![vpc, s3, iam, ec2, rds, lambda, cloudwatch, dashboard]
}

fn highlights() -> Vec<HighlightSpec> {
    vec![
        HighlightSpec::new("EC2 instance", "ec2", "InstanceId"),
        HighlightSpec::new("Public IP", "ec2", "PublicIp"),
        HighlightSpec::new("Log bucket", "s3", "LogBucketName"),
        HighlightSpec::new("Database endpoint", "rds", "DbEndpoint"),
        HighlightSpec::new("Lambda function", "lambda", "FunctionName"),
        HighlightSpec::new("Alarm topic", "cloudwatch", "AlarmTopicArn"),
        HighlightSpec::new("Dashboard", "dashboard", "DashboardUrl"),
    ]
}

/// Full plan for `stackrun deploy`
pub fn deploy_plan(config: &DeployConfig, account_id: &str) -> Result<Deployment> {
    let namespace = config.namespace().clone();
    let bucket = artifact_bucket_name(&namespace, account_id)?;
    let artifact = Artifact::new(LAMBDA_ARTIFACT, &config.environment.lambda_source);

    let inputs = Inputs {
        config,
        artifact_bucket: &bucket,
        lambda_key: artifact.key(),
    };
    let plan = StackPlan::new(units(
        &namespace,
        &config.environment.templates_dir,
        Some(&inputs),
    ))
    .context("Invalid stack plan")?;

    Ok(Deployment {
        namespace,
        plan,
        artifacts: Some(ArtifactSet {
            bucket,
            artifacts: vec![artifact],
        }),
        highlights: highlights(),
    })
}

/// Names-only plan for `stackrun cleanup`; templates and parameters are not
/// needed to delete stacks
pub fn teardown_plan(namespace: &Namespace, account_id: &str) -> Result<Deployment> {
    let bucket = artifact_bucket_name(namespace, account_id)?;
    let plan = StackPlan::new(units(namespace, Path::new(DEFAULT_TEMPLATES_DIR), None))
        .context("Invalid stack plan")?;

    Ok(Deployment {
        namespace: namespace.clone(),
        plan,
        artifacts: Some(ArtifactSet {
            bucket,
            artifacts: Vec::new(),
        }),
        highlights: Vec::new(),
    })
}
