//! CloudFormation operations trait for testing

use super::CloudFormationClient;
use super::types::{
    ChildResource, CreateStackRequest, Export, StackDescription, StackEvent, TemplateValidation,
};
use anyhow::Result;

/// Control-plane operations the orchestrator needs.
///
/// This trait abstracts the CloudFormation client so the deploy and teardown
/// state machines can be exercised without hitting real AWS.
#[allow(async_fn_in_trait)] // Internal use only, the orchestrator never spawns these futures
#[cfg_attr(test, mockall::automock)]
pub trait StackOperations {
    /// Describe a stack by name; `Ok(None)` when it does not exist
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>>;

    /// Syntax-check a template body
    async fn validate_template(&self, template_body: &str) -> Result<TemplateValidation>;

    /// Start stack creation, returning the stack id
    async fn create_stack(&self, request: CreateStackRequest) -> Result<String>;

    /// Start stack deletion
    async fn delete_stack(&self, name: &str) -> Result<()>;

    /// All exports visible in the account/region
    async fn list_exports(&self) -> Result<Vec<Export>>;

    /// Most recent `limit` events of a stack, newest first
    async fn list_events(&self, name: &str, limit: usize) -> Result<Vec<StackEvent>>;

    /// Resources owned by a stack
    async fn list_child_resources(&self, name: &str) -> Result<Vec<ChildResource>>;
}

impl StackOperations for CloudFormationClient {
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>> {
        CloudFormationClient::describe_stack(self, name).await
    }

    async fn validate_template(&self, template_body: &str) -> Result<TemplateValidation> {
        CloudFormationClient::validate_template(self, template_body).await
    }

    async fn create_stack(&self, request: CreateStackRequest) -> Result<String> {
        CloudFormationClient::create_stack(self, request).await
    }

    async fn delete_stack(&self, name: &str) -> Result<()> {
        CloudFormationClient::delete_stack(self, name).await
    }

    async fn list_exports(&self) -> Result<Vec<Export>> {
        CloudFormationClient::list_exports(self).await
    }

    async fn list_events(&self, name: &str, limit: usize) -> Result<Vec<StackEvent>> {
        CloudFormationClient::list_events(self, name, limit).await
    }

    async fn list_child_resources(&self, name: &str) -> Result<Vec<ChildResource>> {
        CloudFormationClient::list_child_resources(self, name).await
    }
}
