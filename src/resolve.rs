//! Validates configured targets and resolves bucket references to bucket names.

use tracing::{error, info};

use crate::config::SyncTarget;
use crate::contract::StackApi;
use crate::error::SyncError;
use crate::stack::StackResourceQuery;

/// A target ready for transfer: bucket name known, prefix defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub local_dir: String,
    pub bucket_name: String,
    pub bucket_prefix: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Check a target's fields without touching the network.
///
/// `index` is the target's position in the configuration, used in errors.
pub fn validate(index: usize, target: &SyncTarget) -> Result<(), SyncError> {
    if present(&target.local_dir).is_none() {
        error!(index, "Sync target is missing localDir");
        return Err(SyncError::InvalidConfiguration {
            index,
            reason: "localDir is required".to_string(),
        });
    }
    if present(&target.bucket_ref).is_none() && present(&target.bucket_name).is_none() {
        error!(index, "Sync target has neither bucketName nor bucketRef");
        return Err(SyncError::InvalidConfiguration {
            index,
            reason: "one of bucketName or bucketRef is required".to_string(),
        });
    }
    Ok(())
}

/// Validate and resolve one target. A `bucketRef` takes precedence over a
/// `bucketName` and is looked up in the stack.
pub async fn resolve_target<A: StackApi + ?Sized>(
    index: usize,
    target: &SyncTarget,
    stack: &StackResourceQuery<'_, A>,
) -> Result<ResolvedTarget, SyncError> {
    validate(index, target)?;

    // validate() guarantees local_dir and one bucket field
    let local_dir = present(&target.local_dir).unwrap_or_default().to_string();
    let bucket_prefix = target.bucket_prefix.clone().unwrap_or_default();

    let bucket_name = match present(&target.bucket_ref) {
        Some(logical_id) => stack.resolve_physical_name(logical_id).await?,
        None => present(&target.bucket_name).unwrap_or_default().to_string(),
    };

    info!(
        index,
        local_dir = %local_dir,
        bucket = %bucket_name,
        prefix = %bucket_prefix,
        "Resolved sync target"
    );

    Ok(ResolvedTarget {
        local_dir,
        bucket_name,
        bucket_prefix,
    })
}
