//! # contract: interfaces to the collaborators around a sync run
//!
//! The orchestration core never talks to the cloud directly. It goes through
//! the traits defined here:
//!
//! - [`StackApi`]: read access to the deployed stack's resource inventory.
//! - [`ObjectStore`]: object-level list/head/put/delete on a bucket.
//! - [`BucketTransfer`]: directory-level sync and delete, reporting progress.
//! - [`Reporter`]: the user-visible console sink.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the mocks are exported under the
//!   default `test-export-mocks` feature so integration tests can use them.
//! - Collaborator errors are boxed trait objects ([`BoxError`]).

use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::Serialize;

use crate::error::{BoxError, TransferError};

/// Resource type of an S3 bucket in the stack inventory.
pub const BUCKET_RESOURCE_TYPE: &str = "AWS::S3::Bucket";

/// Logical id of the deployment framework's own artifact bucket.
pub const DEPLOYMENT_BUCKET_LOGICAL_ID: &str = "ServerlessDeploymentBucket";

/// One resource of a deployed stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackResource {
    pub logical_id: String,
    pub physical_id: String,
    pub resource_type: String,
}

impl StackResource {
    /// Whether the resource is a bucket that may be shown or synced to.
    pub fn is_user_bucket(&self) -> bool {
        self.resource_type == BUCKET_RESOURCE_TYPE
            && self.logical_id != DEPLOYMENT_BUCKET_LOGICAL_ID
    }
}

/// Read-only access to a stack's resource inventory.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StackApi: Send + Sync {
    /// List every resource of the stack (all pages).
    async fn list_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>, BoxError>;

    /// Describe the resources matching a logical id. An empty result means no match.
    async fn describe_stack_resource(
        &self,
        stack_name: &str,
        logical_id: &str,
    ) -> Result<Vec<StackResource>, BoxError>;
}

/// An object as returned by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub size: u64,
}

/// Object-level operations on a bucket.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all objects whose key starts with `prefix`.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<RemoteObject>, BoxError>;

    /// The SHA-256 digest recorded on the object at upload, if any.
    async fn object_digest(&self, bucket: &str, key: &str) -> Result<Option<String>, BoxError>;

    /// Upload a local file, recording its SHA-256 digest on the object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &std::path::Path,
        sha256: &str,
    ) -> Result<(), BoxError>;

    /// Delete the given keys. Callers keep batches at or below [`MAX_DELETE_BATCH`].
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BoxError>;
}

/// Largest number of keys a single delete request may carry.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Cumulative progress of one sync/delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProgress {
    pub amount_done: u64,
    /// Zero while the amount of work is not yet known.
    pub amount_total: u64,
}

/// Side channel carrying progress of a running transfer to the orchestrator.
/// The transfer drops its sender when it returns, which ends the stream.
pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<TransferProgress>;

/// Knobs for a directory sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// Upper bound on object operations in flight.
    pub max_concurrency: usize,
    /// Remove remote objects without a local counterpart.
    pub delete_removed: bool,
    pub follow_symlinks: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            delete_removed: true,
            follow_symlinks: false,
        }
    }
}

/// A fully resolved request to reconcile a local directory into a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub local_dir: PathBuf,
    pub bucket: String,
    pub prefix: String,
    pub options: TransferOptions,
}

/// Terminal success of one sync/delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransferSummary {
    pub uploaded: u64,
    pub deleted: u64,
    pub unchanged: u64,
}

/// Directory-level transfer engine.
///
/// Each call returns exactly one terminal outcome; progress is sent while the
/// call is running and the sender is dropped when it returns.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BucketTransfer: Send + Sync {
    /// One-way reconcile `request.local_dir` into `request.bucket`/`request.prefix`.
    async fn sync_directory(
        &self,
        request: &SyncRequest,
        progress: ProgressSender,
    ) -> Result<TransferSummary, TransferError>;

    /// Delete every object under `prefix`.
    async fn delete_directory(
        &self,
        bucket: &str,
        prefix: &str,
        progress: ProgressSender,
    ) -> Result<TransferSummary, TransferError>;
}

/// User-visible notices of a run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Reporter: Send + Sync {
    /// A prefixed status line (banners, overall completion, warnings).
    fn notice(&self, message: &str);
    /// One quantized progress tick.
    fn tick(&self);
    /// The current target reached its terminal success.
    fn target_completed(&self, bucket: &str, prefix: &str);
    /// An unprefixed line: `label` highlighted, then `detail` plain.
    fn line(&self, label: &str, detail: &str);
}
