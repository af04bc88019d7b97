//! stackrun: deploy and tear down a multi-stack CloudFormation environment
//!
//! `deploy` creates the stacks in dependency order, resuming partially
//! deployed environments. `cleanup` deletes them in reverse order and removes
//! leftovers matching the environment's naming prefix.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stackrun_common::Namespace;
use stackrun_common::defaults::{
    DEFAULT_CPU_THRESHOLD, DEFAULT_LAMBDA_SOURCE, DEFAULT_MAX_WAIT_SECS,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REGION, DEFAULT_TEMPLATES_DIR,
};
use stackrun_coordinator::aws::context::AwsContext;
use stackrun_coordinator::aws::{
    CloudFormationClient, FromAwsContext, MonitoringClient, S3Client, get_current_account_id,
};
use stackrun_coordinator::config::{
    AwsConfig, CleanupConfig, DatabaseConfig, DeployConfig, EnvironmentConfig, MonitoringConfig,
    PollConfig,
};
use stackrun_coordinator::orchestrator::{
    self, DeploySummary, OrchestratorError, TeardownOutcome, TeardownReport, environment,
};
use stackrun_coordinator::secrets::{self, TerminalPrompt};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stackrun")]
#[command(about = "Ordered CloudFormation deploy and teardown")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Flags shared by both commands
#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// Project name (lowercase letters, digits, '-')
    #[arg(long)]
    project_name: String,

    /// Environment name, e.g. dev or prod
    #[arg(long)]
    environment: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,

    /// Seconds between stack status checks
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval: u64,

    /// Maximum seconds to wait for one stack operation
    #[arg(long, default_value_t = DEFAULT_MAX_WAIT_SECS)]
    max_wait: u64,
}

impl TargetArgs {
    fn namespace(&self) -> Result<Namespace> {
        Namespace::new(&self.project_name, &self.environment).context("Invalid environment name")
    }

    fn aws(&self) -> AwsConfig {
        AwsConfig {
            region: self.region.clone(),
            aws_profile: self.aws_profile.clone(),
        }
    }

    fn poll(&self) -> PollConfig {
        PollConfig::from_secs(self.poll_interval, self.max_wait)
    }
}

/// Arguments for the deploy command (extracted to reduce enum size)
#[derive(clap::Args, Debug)]
struct DeployArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Database master username
    #[arg(long)]
    db_username: String,

    /// Email address for alarm notifications (prompted if absent)
    #[arg(long, env = "SNS_EMAIL")]
    sns_email: Option<String>,

    /// Database master password (prompted without echo if absent)
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    /// Enable detailed (1-minute) EC2 monitoring
    #[arg(long)]
    detailed_monitoring: bool,

    /// CPU utilization alarm threshold in percent
    #[arg(long, default_value_t = DEFAULT_CPU_THRESHOLD, value_parser = clap::value_parser!(u8).range(1..=100))]
    cpu_threshold: u8,

    /// Directory containing one `{role}.yaml` template per stack
    #[arg(long, default_value = DEFAULT_TEMPLATES_DIR)]
    templates_dir: PathBuf,

    /// Lambda source file or directory to package
    #[arg(long, default_value = DEFAULT_LAMBDA_SOURCE)]
    lambda_source: PathBuf,

    /// Output JSON file for the deploy summary
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl DeployArgs {
    /// Resolve secrets (prompting if needed) and build the run configuration
    fn into_config(self) -> Result<DeployConfig> {
        let namespace = self.target.namespace()?;
        let mut prompt = TerminalPrompt;
        let sns_email = secrets::resolve_email(self.sns_email, &mut prompt)?;
        let password = secrets::resolve_db_password(self.db_password, &mut prompt)?;

        Ok(DeployConfig {
            aws: self.target.aws(),
            environment: EnvironmentConfig {
                namespace,
                templates_dir: self.templates_dir,
                lambda_source: self.lambda_source,
            },
            database: DatabaseConfig {
                username: self.db_username,
                password,
            },
            monitoring: MonitoringConfig {
                sns_email,
                detailed_monitoring: self.detailed_monitoring,
                cpu_threshold: self.cpu_threshold,
            },
            poll: self.target.poll(),
            output: self.output,
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create (or resume creating) every stack of the environment
    Deploy(Box<DeployArgs>),

    /// Delete every stack of the environment and its leftovers
    Cleanup {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            print_error(&e);
            std::process::exit(1);
        }
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    // Print main error message
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    // Print error chain (causes)
    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Reduce noise from AWS SDK (show only warnings and errors)
                tracing_subscriber::EnvFilter::new(
                    "info,aws_config=warn,aws_sdk=warn,aws_smithy=warn,aws_smithy_runtime=warn",
                )
            }),
        )
        .init();
}

/// Deploy errors keep their recent events in the message
fn into_anyhow(e: OrchestratorError) -> anyhow::Error {
    match e {
        OrchestratorError::Remote(inner) => inner,
        other => anyhow::anyhow!(other.detailed()),
    }
}

/// Returns whether the command fully succeeded
async fn run() -> Result<bool> {
    let args = Args::parse();
    init_tracing();

    match args.command {
        Command::Deploy(deploy_args) => {
            let config = deploy_args.into_config()?;
            handle_deploy(config).await?;
            Ok(true)
        }
        Command::Cleanup { target } => {
            let config = CleanupConfig {
                aws: target.aws(),
                namespace: target.namespace()?,
                poll: target.poll(),
            };
            let report = handle_cleanup(&config).await?;
            Ok(report.is_success())
        }
    }
}

async fn handle_deploy(config: DeployConfig) -> Result<()> {
    if let Some(profile) = config.aws_profile() {
        info!(profile = %profile, "Using AWS profile");
    }
    info!(
        namespace = %config.namespace(),
        region = %config.region(),
        templates = %config.environment.templates_dir.display(),
        detailed_monitoring = config.monitoring.detailed_monitoring,
        cpu_threshold = config.monitoring.cpu_threshold,
        "Starting deploy"
    );

    let aws = AwsContext::with_profile(config.region(), config.aws_profile()).await;
    let account_id = get_current_account_id(aws.sdk_config()).await?;
    let deployment = environment::deploy_plan(&config, account_id.as_str())?;

    let stacks = CloudFormationClient::from_context(&aws);
    let buckets = S3Client::from_context(&aws);

    let summary = orchestrator::deploy(&stacks, &buckets, &deployment, &config.poll)
        .await
        .map_err(into_anyhow)?;

    print_summary(&summary);

    if let Some(path) = &config.output {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        info!(path = %path.display(), "Deploy summary written");
    }
    Ok(())
}

async fn handle_cleanup(config: &CleanupConfig) -> Result<TeardownReport> {
    info!(namespace = %config.namespace, region = %config.region(), "Starting cleanup");

    let aws = AwsContext::with_profile(config.region(), config.aws_profile()).await;
    let account_id = get_current_account_id(aws.sdk_config()).await?;
    let deployment = environment::teardown_plan(&config.namespace, account_id.as_str())?;

    let stacks = CloudFormationClient::from_context(&aws);
    let buckets = S3Client::from_context(&aws);
    let monitoring = MonitoringClient::from_context(&aws);

    let report =
        orchestrator::teardown(&stacks, &buckets, &monitoring, &deployment, &config.poll).await;
    print_teardown(config, &report);
    Ok(report)
}

fn print_summary(summary: &DeploySummary) {
    println!("\n=== Deploy Summary ===");
    println!("Environment: {}", summary.namespace);
    println!();
    for unit in &summary.units {
        println!("  {:<28} {:<9} {}", unit.name, unit.outcome, unit.status);
    }
    if !summary.highlights.is_empty() {
        println!();
        for highlight in &summary.highlights {
            println!("  {:<20} {}", format!("{}:", highlight.label), highlight.value);
        }
    }
    println!();
    println!(
        "Created {} of {} stacks",
        summary.created_count(),
        summary.units.len()
    );
}

fn print_teardown(config: &CleanupConfig, report: &TeardownReport) {
    println!("\n=== Cleanup Report ===");
    println!("Environment: {}", config.namespace);
    println!("Region: {}", config.region());
    println!();
    for unit in &report.units {
        let outcome = match &unit.outcome {
            TeardownOutcome::NotFound => "not found",
            TeardownOutcome::Deleted => "deleted",
            TeardownOutcome::Failed(_) => "FAILED",
        };
        println!("  {:<28} {}", unit.name, outcome);
    }
    println!();
    println!("Objects removed:  {}", report.sweep.removed);
    println!("Orphans deleted:  {}", report.orphans.deleted.len());
    for (kind, name) in &report.orphans.deleted {
        println!("  {kind}: {name}");
    }

    let warnings: Vec<String> = report
        .sweep
        .warnings
        .iter()
        .map(ToString::to_string)
        .chain(report.orphans.warnings.iter().cloned())
        .chain(report.artifact_warnings.iter().cloned())
        .collect();
    if !warnings.is_empty() {
        println!();
        println!("Warnings ({}):", warnings.len());
        for warning in &warnings {
            println!("  {warning}");
        }
    }

    for unit in report.failed_units() {
        if let TeardownOutcome::Failed(detail) = &unit.outcome {
            eprintln!("\n\x1b[1;31mFailed:\x1b[0m {detail}");
        }
    }
}
