//! CloudFormation stack management

mod operations;
mod types;

pub use operations::StackOperations;
#[cfg(test)]
pub use operations::MockStackOperations;
pub use types::{
    ChildResource, CreateStackRequest, Export, ResolvedParameter, StackDescription, StackEvent,
    StackOutput, TemplateValidation, format_events,
};

use crate::aws::context::{AwsContext, FromAwsContext};
use crate::aws::error::classify_sdk_error;
use crate::aws::field::SdkField;
use anyhow::{Context, Result};
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::types::{Capability as SdkCapability, Parameter, Tag};
use stackrun_common::StackStatus;
use tracing::{debug, info};

/// CloudFormation client for stack lifecycle operations
pub struct CloudFormationClient {
    client: Client,
}

impl FromAwsContext for CloudFormationClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.cloudformation_client(),
        }
    }
}

impl CloudFormationClient {
    /// Create a new client for a region
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Describe a stack by name, mapping "does not exist" to `None`
    pub async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>> {
        let response = match self.client.describe_stacks().stack_name(name).send().await {
            Ok(r) => r,
            Err(e) => {
                if classify_sdk_error(&e).is_not_found() {
                    debug!(stack = %name, "Stack does not exist");
                    return Ok(None);
                }
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("Failed to describe stack {name}"));
            }
        };

        let Some(stack) = response.stacks().first() else {
            return Ok(None);
        };

        let status = stack
            .stack_status()
            .field()
            .map(|s| StackStatus::parse(s.as_str()))
            .context("DescribeStacks returned a stack without a status")?;

        let outputs = stack
            .outputs()
            .iter()
            .filter_map(|o| {
                Some(StackOutput {
                    key: o.output_key()?.to_string(),
                    value: o.output_value()?.to_string(),
                    export_name: o.export_name().map(str::to_string),
                })
            })
            .collect();

        Ok(Some(StackDescription {
            name: stack.stack_name().field().unwrap_or(name).to_string(),
            stack_id: stack.stack_id().map(str::to_string),
            status,
            status_reason: stack.stack_status_reason().map(str::to_string),
            outputs,
        }))
    }

    /// Remote syntax check of a template body
    pub async fn validate_template(&self, template_body: &str) -> Result<TemplateValidation> {
        match self
            .client
            .validate_template()
            .template_body(template_body)
            .send()
            .await
        {
            Ok(_) => Ok(TemplateValidation::Valid),
            Err(e) => {
                let classified = classify_sdk_error(&e);
                if classified.is_validation() {
                    return Ok(TemplateValidation::Invalid(classified.to_string()));
                }
                Err(anyhow::Error::new(e)).context("Failed to validate template")
            }
        }
    }

    /// Start creating a stack
    pub async fn create_stack(&self, request: CreateStackRequest) -> Result<String> {
        info!(
            stack = %request.name,
            parameters = ?request.parameters,
            capabilities = ?request.capabilities,
            "Creating stack"
        );

        let parameters = request
            .parameters
            .iter()
            .map(|p| {
                Parameter::builder()
                    .parameter_key(&p.key)
                    .parameter_value(p.value())
                    .build()
            })
            .collect();

        let capabilities = request
            .capabilities
            .iter()
            .map(|c| SdkCapability::from(c.to_string().as_str()))
            .collect();

        let tags: Vec<Tag> = request
            .tags
            .iter()
            .map(|(k, v)| Tag::builder().key(k).value(v).build())
            .collect();

        let response = self
            .client
            .create_stack()
            .stack_name(&request.name)
            .template_body(&request.template_body)
            .set_parameters(Some(parameters))
            .set_capabilities(Some(capabilities))
            .set_tags(Some(tags))
            .send()
            .await
            .with_context(|| format!("Failed to create stack {}", request.name))?;

        Ok(response
            .stack_id()
            .map(str::to_string)
            .unwrap_or_else(|| request.name.clone()))
    }

    /// Start deleting a stack
    pub async fn delete_stack(&self, name: &str) -> Result<()> {
        info!(stack = %name, "Deleting stack");
        self.client
            .delete_stack()
            .stack_name(name)
            .send()
            .await
            .with_context(|| format!("Failed to delete stack {name}"))?;
        Ok(())
    }

    /// List every export in the region
    pub async fn list_exports(&self) -> Result<Vec<Export>> {
        let mut exports = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_exports()
                .set_next_token(next_token.take())
                .send()
                .await
                .context("Failed to list exports")?;

            exports.extend(response.exports().iter().filter_map(|e| {
                Some(Export {
                    name: e.name()?.to_string(),
                    value: e.value()?.to_string(),
                })
            }));

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = exports.len(), "Listed exports");
        Ok(exports)
    }

    /// Most recent events of a stack (DescribeStackEvents is newest first)
    pub async fn list_events(&self, name: &str, limit: usize) -> Result<Vec<StackEvent>> {
        let response = self
            .client
            .describe_stack_events()
            .stack_name(name)
            .send()
            .await
            .with_context(|| format!("Failed to describe events for stack {name}"))?;

        Ok(response
            .stack_events()
            .iter()
            .take(limit)
            .map(|e| StackEvent {
                timestamp: e
                    .timestamp()
                    .field()
                    .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                logical_id: e.logical_resource_id().field().map(str::to_string),
                resource_type: e.resource_type().field().map(str::to_string),
                resource_status: e
                    .resource_status()
                    .field()
                    .map(|s| s.as_str().to_string()),
                physical_id: e.physical_resource_id().field().map(str::to_string),
                reason: e.resource_status_reason().field().map(str::to_string),
            })
            .collect())
    }

    /// List a stack's resources (paginated)
    pub async fn list_child_resources(&self, name: &str) -> Result<Vec<ChildResource>> {
        let mut resources = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_stack_resources()
                .stack_name(name)
                .set_next_token(next_token.take())
                .send()
                .await
                .with_context(|| format!("Failed to list resources of stack {name}"))?;

            for summary in response.stack_resource_summaries() {
                let (Some(resource_type), Some(logical_id)) = (
                    summary.resource_type().field(),
                    summary.logical_resource_id().field(),
                ) else {
                    continue;
                };
                resources.push(ChildResource {
                    resource_type: resource_type.to_string(),
                    logical_id: logical_id.to_string(),
                    physical_id: summary.physical_resource_id().map(str::to_string),
                });
            }

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(resources)
    }
}
