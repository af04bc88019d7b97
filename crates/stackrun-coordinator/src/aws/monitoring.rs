//! CloudWatch alarms, SNS topics and CloudWatch Logs log groups
//!
//! These are the resource kinds most often left behind by partial runs
//! (alarms created out of band, log groups auto-created by Lambda). They are
//! discovered by listing everything of a kind; the orchestrator filters by
//! namespace prefix.

use crate::aws::context::{AwsContext, FromAwsContext};
use anyhow::{Context, Result};
use aws_sdk_cloudwatch::types::AlarmType;
use stackrun_common::OrphanKind;
use tracing::{debug, info};

/// Client bundle for the monitoring services
pub struct MonitoringClient {
    cloudwatch: aws_sdk_cloudwatch::Client,
    logs: aws_sdk_cloudwatchlogs::Client,
    sns: aws_sdk_sns::Client,
}

impl FromAwsContext for MonitoringClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            cloudwatch: ctx.cloudwatch_client(),
            logs: ctx.logs_client(),
            sns: ctx.sns_client(),
        }
    }
}

impl MonitoringClient {
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    async fn list_alarms(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let response = self
                .cloudwatch
                .describe_alarms()
                .alarm_types(AlarmType::MetricAlarm)
                .alarm_types(AlarmType::CompositeAlarm)
                .set_next_token(next_token.take())
                .send()
                .await
                .context("Failed to describe alarms")?;
            names.extend(
                response
                    .metric_alarms()
                    .iter()
                    .filter_map(|a| a.alarm_name().map(str::to_string)),
            );
            names.extend(
                response
                    .composite_alarms()
                    .iter()
                    .filter_map(|a| a.alarm_name().map(str::to_string)),
            );
            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    async fn list_topics(&self) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let response = self
                .sns
                .list_topics()
                .set_next_token(next_token.take())
                .send()
                .await
                .context("Failed to list SNS topics")?;
            arns.extend(
                response
                    .topics()
                    .iter()
                    .filter_map(|t| t.topic_arn().map(str::to_string)),
            );
            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(arns)
    }

    async fn list_log_groups(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let response = self
                .logs
                .describe_log_groups()
                .set_next_token(next_token.take())
                .send()
                .await
                .context("Failed to describe log groups")?;
            names.extend(
                response
                    .log_groups()
                    .iter()
                    .filter_map(|g| g.log_group_name().map(str::to_string)),
            );
            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    /// List every resource name (topic ARN for topics) of a kind
    pub async fn list_names(&self, kind: OrphanKind) -> Result<Vec<String>> {
        let names = match kind {
            OrphanKind::Alarm => self.list_alarms().await?,
            OrphanKind::Topic => self.list_topics().await?,
            OrphanKind::LogGroup => self.list_log_groups().await?,
        };
        debug!(kind = %kind, count = names.len(), "Listed resources");
        Ok(names)
    }

    /// Delete one resource by name (topic ARN for topics)
    pub async fn delete(&self, kind: OrphanKind, name: &str) -> Result<()> {
        info!(kind = %kind, name = %name, "Deleting");
        match kind {
            OrphanKind::Alarm => {
                self.cloudwatch
                    .delete_alarms()
                    .alarm_names(name)
                    .send()
                    .await
                    .with_context(|| format!("Failed to delete alarm {name}"))?;
            }
            OrphanKind::Topic => {
                self.sns
                    .delete_topic()
                    .topic_arn(name)
                    .send()
                    .await
                    .with_context(|| format!("Failed to delete topic {name}"))?;
            }
            OrphanKind::LogGroup => {
                self.logs
                    .delete_log_group()
                    .log_group_name(name)
                    .send()
                    .await
                    .with_context(|| format!("Failed to delete log group {name}"))?;
            }
        }
        Ok(())
    }
}

/// Trait for orphan discovery and deletion.
#[allow(async_fn_in_trait)] // Internal use only, the orchestrator never spawns these futures
#[cfg_attr(test, mockall::automock)]
pub trait OrphanOperations {
    /// Every resource name of a kind in the region
    async fn list_names(&self, kind: OrphanKind) -> Result<Vec<String>>;

    /// Delete one resource
    async fn delete(&self, kind: OrphanKind, name: &str) -> Result<()>;
}

impl OrphanOperations for MonitoringClient {
    async fn list_names(&self, kind: OrphanKind) -> Result<Vec<String>> {
        MonitoringClient::list_names(self, kind).await
    }

    async fn delete(&self, kind: OrphanKind, name: &str) -> Result<()> {
        MonitoringClient::delete(self, kind, name).await
    }
}
