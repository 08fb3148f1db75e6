//! Error taxonomy for resolving and transferring sync targets.

use thiserror::Error;

/// Boxed error returned by the external collaborators (stack API, object store).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort a run. No variant is retried; the first one ends the run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A configured target is missing a required field.
    #[error("Invalid custom.syncS3Buckets options (entry {index}): {reason}")]
    InvalidConfiguration { index: usize, reason: String },

    /// The stack has no resource with this logical id.
    #[error("No resource with logical id '{logical_id}' in stack '{stack_name}'")]
    ResourceNotFound {
        logical_id: String,
        stack_name: String,
    },

    /// The stack inventory could not be queried while resolving a logical id.
    #[error("Failed to resolve bucket reference '{logical_id}': {source}")]
    ResourceResolutionFailed {
        logical_id: String,
        #[source]
        source: BoxError,
    },

    /// Listing the stack's resources failed.
    #[error("Failed to list resources of stack '{stack_name}': {source}")]
    StackQueryFailed {
        stack_name: String,
        #[source]
        source: BoxError,
    },

    /// The sync or delete operation for a bucket reported an error.
    #[error("Transfer to s3://{bucket}/{prefix} failed: {source}")]
    TransferFailed {
        bucket: String,
        prefix: String,
        #[source]
        source: TransferError,
    },

    /// A lifecycle event name with no registered hook.
    #[error("Unknown lifecycle event '{0}'")]
    UnknownHook(String),
}

/// Terminal failure of a single sync/delete operation.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("I/O error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk local directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// The local source is not a directory, so there is no tree to mirror.
    #[error("Local path {path} is not a directory")]
    NotADirectory { path: String },

    #[error("Object store error: {0}")]
    Store(BoxError),
}
