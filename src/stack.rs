//! Stack inventory queries: which buckets a deployed stack owns, and what a
//! logical id resolves to at run time.

use tracing::{debug, error, info};

use crate::contract::{StackApi, StackResource};
use crate::error::SyncError;

/// Identifies the deployed stack a run works against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackContext {
    pub service: String,
    pub stage: String,
    pub region: String,
}

impl StackContext {
    /// Stack name as the deployment framework derives it: `{service}-{stage}`.
    pub fn stack_name(&self) -> String {
        format!("{}-{}", self.service, self.stage)
    }
}

/// Reads the resource inventory of one stack. Every call queries afresh.
pub struct StackResourceQuery<'a, A: StackApi + ?Sized> {
    api: &'a A,
    context: StackContext,
}

impl<'a, A: StackApi + ?Sized> StackResourceQuery<'a, A> {
    pub fn new(api: &'a A, context: StackContext) -> Self {
        Self { api, context }
    }

    pub fn context(&self) -> &StackContext {
        &self.context
    }

    /// Bucket resources of the stack, excluding the deployment artifact bucket.
    pub async fn list_bucket_resources(&self) -> Result<Vec<StackResource>, SyncError> {
        let stack_name = self.context.stack_name();
        info!(stack_name = %stack_name, region = %self.context.region, "Listing stack resources");

        let resources = self
            .api
            .list_stack_resources(&stack_name)
            .await
            .map_err(|source| {
                error!(stack_name = %stack_name, error = %source, "Listing stack resources failed");
                SyncError::StackQueryFailed {
                    stack_name: stack_name.clone(),
                    source,
                }
            })?;

        let total = resources.len();
        let buckets: Vec<StackResource> = resources
            .into_iter()
            .filter(StackResource::is_user_bucket)
            .collect();
        debug!(total, buckets = buckets.len(), "Filtered stack resources to buckets");
        Ok(buckets)
    }

    /// Physical id of the resource with the given logical id.
    pub async fn resolve_physical_name(&self, logical_id: &str) -> Result<String, SyncError> {
        let stack_name = self.context.stack_name();
        info!(stack_name = %stack_name, logical_id, "Resolving physical resource name");

        let matches = self
            .api
            .describe_stack_resource(&stack_name, logical_id)
            .await
            .map_err(|source| {
                error!(logical_id, error = %source, "Describing stack resource failed");
                SyncError::ResourceResolutionFailed {
                    logical_id: logical_id.to_string(),
                    source,
                }
            })?;

        match matches.into_iter().next() {
            Some(resource) if !resource.physical_id.is_empty() => {
                info!(logical_id, physical_id = %resource.physical_id, "Resolved bucket reference");
                Ok(resource.physical_id)
            }
            _ => {
                error!(logical_id, stack_name = %stack_name, "No matching resource in stack");
                Err(SyncError::ResourceNotFound {
                    logical_id: logical_id.to_string(),
                    stack_name,
                })
            }
        }
    }
}
