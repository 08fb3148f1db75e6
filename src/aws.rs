//! AWS SDK adapters for the [`StackApi`] and [`ObjectStore`] contracts.
//!
//! Credentials come from the SDK's default provider chain; nothing here
//! stores or manages them.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::Client as CloudFormationClient;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, error, info};

use crate::contract::{ObjectStore, RemoteObject, StackApi, StackResource};
use crate::error::BoxError;

/// User metadata key holding an object's SHA-256 content digest.
pub const DIGEST_METADATA_KEY: &str = "sha256";

/// Load the SDK configuration for a region from the default provider chain.
pub async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}

fn sdk_error<E: std::error::Error>(err: E) -> BoxError {
    format!("{}", DisplayErrorContext(&err)).into()
}

// Accepts both optional and required SDK string members.
fn text<'a>(value: impl Into<Option<&'a str>>) -> String {
    value.into().unwrap_or_default().to_string()
}

/// [`StackApi`] over CloudFormation.
pub struct CloudFormationStackApi {
    client: CloudFormationClient,
}

impl CloudFormationStackApi {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: CloudFormationClient::new(sdk_config),
        }
    }
}

#[async_trait]
impl StackApi for CloudFormationStackApi {
    async fn list_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>, BoxError> {
        let mut resources = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .client
                .list_stack_resources()
                .stack_name(stack_name)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    error!(stack_name, error = %DisplayErrorContext(&e), "ListStackResources failed");
                    sdk_error(e)
                })?;

            resources.extend(output.stack_resource_summaries().iter().map(|summary| {
                StackResource {
                    logical_id: text(summary.logical_resource_id()),
                    physical_id: text(summary.physical_resource_id()),
                    resource_type: text(summary.resource_type()),
                }
            }));

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        info!(stack_name, count = resources.len(), "Listed stack resources");
        Ok(resources)
    }

    async fn describe_stack_resource(
        &self,
        stack_name: &str,
        logical_id: &str,
    ) -> Result<Vec<StackResource>, BoxError> {
        let output = self
            .client
            .describe_stack_resources()
            .stack_name(stack_name)
            .logical_resource_id(logical_id)
            .send()
            .await
            .map_err(|e| {
                error!(stack_name, logical_id, error = %DisplayErrorContext(&e), "DescribeStackResources failed");
                sdk_error(e)
            })?;

        Ok(output
            .stack_resources()
            .iter()
            .map(|resource| StackResource {
                logical_id: text(resource.logical_resource_id()),
                physical_id: text(resource.physical_resource_id()),
                resource_type: text(resource.resource_type()),
            })
            .collect())
    }
}

/// [`ObjectStore`] over S3.
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: S3Client::new(sdk_config),
        }
    }
}

fn object_size(value: impl Into<Option<i64>>) -> u64 {
    value.into().unwrap_or(0).max(0) as u64
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<RemoteObject>, BoxError> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| {
                    error!(bucket, prefix, error = %DisplayErrorContext(&e), "ListObjectsV2 failed");
                    sdk_error(e)
                })?;

            objects.extend(output.contents().iter().filter_map(|object| {
                object.key().map(|key| RemoteObject {
                    key: key.to_string(),
                    size: object_size(object.size()),
                })
            }));

            token = output.next_continuation_token().map(str::to_string);
            if token.is_none() {
                break;
            }
        }
        debug!(bucket, prefix, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn object_digest(&self, bucket: &str, key: &str) -> Result<Option<String>, BoxError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(output
                .metadata()
                .and_then(|metadata| metadata.get(DIGEST_METADATA_KEY))
                .cloned()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    error!(bucket, key, error = %service_err, "HeadObject failed");
                    Err(sdk_error(service_err))
                }
            }
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        sha256: &str,
    ) -> Result<(), BoxError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| -> BoxError { format!("reading {}: {e}", path.display()).into() })?;
        let content_type = mime_guess::from_path(path).first_or_octet_stream();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type.essence_str())
            .metadata(DIGEST_METADATA_KEY, sha256)
            .send()
            .await
            .map_err(|e| {
                error!(bucket, key, error = %DisplayErrorContext(&e), "PutObject failed");
                sdk_error(e)
            })?;
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BoxError> {
        if keys.is_empty() {
            return Ok(());
        }
        let identifiers = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(sdk_error)?;
        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()
            .map_err(sdk_error)?;

        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                error!(bucket, error = %DisplayErrorContext(&e), "DeleteObjects failed");
                sdk_error(e)
            })?;

        if let Some(failed) = output.errors().first() {
            error!(
                bucket,
                failures = output.errors().len(),
                key = failed.key().unwrap_or_default(),
                "DeleteObjects reported per-key failures"
            );
            return Err(format!(
                "failed to delete s3://{bucket}/{}: {}",
                failed.key().unwrap_or_default(),
                failed.message().unwrap_or("unknown error")
            )
            .into());
        }
        Ok(())
    }
}
