//! High-level pipeline: resolve each configured target, then sync or delete it.
//!
//! # Responsibilities
//! - Fail-fast orchestration: targets run strictly in declaration order, one
//!   resolved-and-transferred before the next starts; the first error ends the
//!   run and is returned.
//! - Progress: a fresh [`ProgressReporter`] per target turns transfer progress
//!   into ticks on the [`Reporter`].
//! - Reporting: a [`RunReport`] only ever lists targets that completed.
//!
//! # Navigation
//! - Entrypoints: [`synchronise`], [`remove_all`], [`print_bucket_inventory`]
//! - Supporting types: [`RunReport`], [`TargetReport`]

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::contract::{BucketTransfer, Reporter, StackApi, SyncRequest, TransferOptions, TransferSummary};
use crate::error::SyncError;
use crate::progress::ProgressReporter;
use crate::resolve::{resolve_target, ResolvedTarget};
use crate::stack::StackResourceQuery;

pub const NO_TARGETS_NOTICE: &str = "No SyncS3Buckets options to process.";
pub const SYNC_BANNER: &str = "Syncing content to s3 buckets...";
pub const DELETE_BANNER: &str = "Removing content from s3 buckets...";
pub const ALL_COMPLETED_NOTICE: &str = "All buckets completed!";

/// What a run does to each resolved target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Sync,
    Delete,
}

impl Operation {
    fn banner(self) -> &'static str {
        match self {
            Operation::Sync => SYNC_BANNER,
            Operation::Delete => DELETE_BANNER,
        }
    }
}

/// Outcome of one completed target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub local_dir: String,
    pub bucket_name: String,
    pub bucket_prefix: String,
    pub summary: TransferSummary,
}

/// Outcome of a successful run, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub targets: Vec<TargetReport>,
}

/// Sync every configured local directory into its bucket.
pub async fn synchronise<A, T>(
    config: &Config,
    stack_api: &A,
    transfer: &T,
    reporter: &dyn Reporter,
    options: &TransferOptions,
) -> Result<RunReport, SyncError>
where
    A: StackApi + ?Sized,
    T: BucketTransfer + ?Sized,
{
    run_targets(Operation::Sync, config, stack_api, transfer, reporter, options).await
}

/// Delete everything under each configured bucket/prefix.
pub async fn remove_all<A, T>(
    config: &Config,
    stack_api: &A,
    transfer: &T,
    reporter: &dyn Reporter,
) -> Result<RunReport, SyncError>
where
    A: StackApi + ?Sized,
    T: BucketTransfer + ?Sized,
{
    run_targets(
        Operation::Delete,
        config,
        stack_api,
        transfer,
        reporter,
        &TransferOptions::default(),
    )
    .await
}

async fn run_targets<A, T>(
    operation: Operation,
    config: &Config,
    stack_api: &A,
    transfer: &T,
    reporter: &dyn Reporter,
    options: &TransferOptions,
) -> Result<RunReport, SyncError>
where
    A: StackApi + ?Sized,
    T: BucketTransfer + ?Sized,
{
    if config.targets.is_empty() {
        info!(?operation, "No sync targets configured");
        reporter.notice(NO_TARGETS_NOTICE);
        return Ok(RunReport::default());
    }

    info!(?operation, targets = config.targets.len(), "Starting run");
    reporter.notice(operation.banner());

    let stack = StackResourceQuery::new(stack_api, config.stack.clone());
    let mut report = RunReport::default();

    for (index, target) in config.targets.iter().enumerate() {
        let resolved = resolve_target(index, target, &stack).await?;
        let summary = transfer_target(operation, config, &resolved, transfer, reporter, options)
            .await?;

        reporter.target_completed(&resolved.bucket_name, &resolved.bucket_prefix);
        info!(
            index,
            bucket = %resolved.bucket_name,
            uploaded = summary.uploaded,
            deleted = summary.deleted,
            unchanged = summary.unchanged,
            "Target completed"
        );
        report.targets.push(TargetReport {
            local_dir: resolved.local_dir,
            bucket_name: resolved.bucket_name,
            bucket_prefix: resolved.bucket_prefix,
            summary,
        });
    }

    reporter.notice(ALL_COMPLETED_NOTICE);
    match serde_json::to_string(&report) {
        Ok(json) => debug!(report = %json, "Run report"),
        Err(e) => error!(error = ?e, "Failed to serialize run report"),
    }
    Ok(report)
}

async fn transfer_target<T: BucketTransfer + ?Sized>(
    operation: Operation,
    config: &Config,
    target: &ResolvedTarget,
    transfer: &T,
    reporter: &dyn Reporter,
    options: &TransferOptions,
) -> Result<TransferSummary, SyncError> {
    let progress = ProgressReporter::new(reporter);
    let (sender, receiver) = mpsc::unbounded_channel();
    let run = async {
        match operation {
            Operation::Sync => {
                let request = SyncRequest {
                    local_dir: config.service_path.join(&target.local_dir),
                    bucket: target.bucket_name.clone(),
                    prefix: target.bucket_prefix.clone(),
                    options: options.clone(),
                };
                transfer.sync_directory(&request, sender).await
            }
            Operation::Delete => {
                transfer
                    .delete_directory(&target.bucket_name, &target.bucket_prefix, sender)
                    .await
            }
        }
    };
    let (outcome, ()) = tokio::join!(run, progress.drain(receiver));

    outcome.map_err(|source| {
        error!(
            ?operation,
            bucket = %target.bucket_name,
            prefix = %target.bucket_prefix,
            error = %source,
            "Transfer failed"
        );
        SyncError::TransferFailed {
            bucket: target.bucket_name.clone(),
            prefix: target.bucket_prefix.clone(),
            source,
        }
    })
}

/// Print the stack's buckets as `LogicalId : PhysicalId` lines. Prints
/// nothing when the stack has no user buckets.
pub async fn print_bucket_inventory<A: StackApi + ?Sized>(
    config: &Config,
    stack_api: &A,
    reporter: &dyn Reporter,
) -> Result<(), SyncError> {
    let stack = StackResourceQuery::new(stack_api, config.stack.clone());
    let buckets = stack.list_bucket_resources().await?;
    info!(count = buckets.len(), "Fetched bucket inventory");

    if buckets.is_empty() {
        return Ok(());
    }
    reporter.line("s3 buckets:", "");
    for bucket in &buckets {
        reporter.line(
            &format!("  {}", bucket.logical_id),
            &format!(" : {}", bucket.physical_id),
        );
    }
    Ok(())
}
