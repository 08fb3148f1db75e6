//! Reconciling transfer engine: one-way directory sync and prefix deletion on
//! top of an [`ObjectStore`].
//!
//! A sync walks the local tree (symbolic links are not followed), lists the
//! remote objects under the prefix, uploads every file that is missing or
//! whose content differs, and deletes remote objects that have no local
//! counterpart. Content is compared by size first and then by the SHA-256
//! digest recorded on each object at upload time, so syncing an unchanged
//! tree twice uploads nothing the second time.
//!
//! The local source must be a directory. Anything else is rejected before
//! the bucket is listed, so a misconfigured path never plans deletions.
//!
//! Object operations run with bounded concurrency (`buffer_unordered`). The
//! first failing operation ends the transfer; operations still in flight are
//! dropped.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::contract::{
    BucketTransfer, ObjectStore, ProgressSender, SyncRequest, TransferProgress, TransferSummary,
    MAX_DELETE_BATCH,
};
use crate::error::TransferError;

/// Key prefix with a trailing `/` when non-empty.
pub fn normalized_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

const DIGEST_CHUNK: usize = 64 * 1024;

/// Object key for a file at `relative` below the synced directory, or `None`
/// when a path component is not valid UTF-8.
pub fn object_key(prefix: &str, relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<&str>>>()?;
    Some(format!("{}{}", normalized_prefix(prefix), parts.join("/")))
}

/// A regular file found below the synced directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Collect the regular files below `root` with their object keys.
///
/// Files whose names are not valid UTF-8 are skipped with a warning.
pub fn scan_local(
    root: &Path,
    prefix: &str,
    follow_symlinks: bool,
) -> Result<Vec<LocalFile>, TransferError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| entry.path());
        // the root itself is a file
        if relative.as_os_str().is_empty() {
            return Err(TransferError::NotADirectory {
                path: root.display().to_string(),
            });
        }
        let Some(key) = object_key(prefix, relative) else {
            warn!(path = %entry.path().display(), "Skipping file with a non UTF-8 name");
            continue;
        };
        let size = entry.metadata()?.len();
        files.push(LocalFile {
            key,
            path: entry.path().to_path_buf(),
            size,
        });
    }
    files.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(files)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> TransferError + '_ {
    move |source| TransferError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Hex SHA-256 of a file's content, read in chunks.
pub async fn file_digest(path: &Path) -> Result<String, TransferError> {
    let file = tokio::fs::File::open(path).await.map_err(io_error(path))?;
    let mut reader = BufReader::with_capacity(DIGEST_CHUNK, file);
    let mut hasher = Sha256::new();
    loop {
        let chunk = reader.fill_buf().await.map_err(io_error(path))?;
        if chunk.is_empty() {
            break;
        }
        let len = chunk.len();
        hasher.update(chunk);
        reader.consume(len);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fails unless `path` is an existing directory.
async fn ensure_directory(path: &Path) -> Result<(), TransferError> {
    let metadata = tokio::fs::metadata(path).await.map_err(io_error(path))?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(TransferError::NotADirectory {
            path: path.display().to_string(),
        })
    }
}

enum FileAction {
    Uploaded,
    Unchanged,
}

/// Counts completed object operations and forwards cumulative progress.
struct Tally {
    done: AtomicU64,
    total: u64,
    sender: ProgressSender,
}

impl Tally {
    fn start(total: u64, sender: ProgressSender) -> Self {
        let tally = Self {
            done: AtomicU64::new(0),
            total,
            sender,
        };
        tally.send(0);
        tally
    }

    fn advance(&self, amount: u64) {
        let done = self.done.fetch_add(amount, Ordering::SeqCst) + amount;
        self.send(done);
    }

    fn send(&self, done: u64) {
        // a receiver that stopped listening does not affect the transfer
        let _ = self.sender.send(TransferProgress {
            amount_done: done,
            amount_total: self.total,
        });
    }
}

/// [`BucketTransfer`] implementation reconciling against an [`ObjectStore`].
pub struct ReconcilingTransfer<S> {
    store: S,
}

impl<S: ObjectStore> ReconcilingTransfer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn reconcile_file(
        &self,
        bucket: &str,
        file: &LocalFile,
        remote_size: Option<u64>,
    ) -> Result<FileAction, TransferError> {
        let digest = file_digest(&file.path).await?;
        if remote_size == Some(file.size) {
            let remote_digest = self
                .store
                .object_digest(bucket, &file.key)
                .await
                .map_err(TransferError::Store)?;
            if remote_digest.as_deref() == Some(digest.as_str()) {
                debug!(key = %file.key, "Object up to date");
                return Ok(FileAction::Unchanged);
            }
        }
        debug!(key = %file.key, size = file.size, "Uploading object");
        self.store
            .put_object(bucket, &file.key, &file.path, &digest)
            .await
            .map_err(TransferError::Store)?;
        Ok(FileAction::Uploaded)
    }

    async fn reconcile_counted(
        &self,
        bucket: &str,
        file: &LocalFile,
        remote_size: Option<u64>,
        tally: &Tally,
    ) -> Result<FileAction, TransferError> {
        let action = self.reconcile_file(bucket, file, remote_size).await?;
        tally.advance(1);
        Ok(action)
    }

    async fn delete_keys(
        &self,
        bucket: &str,
        keys: &[String],
        tally: &Tally,
    ) -> Result<u64, TransferError> {
        let mut deleted = 0u64;
        for batch in keys.chunks(MAX_DELETE_BATCH) {
            debug!(bucket, count = batch.len(), "Deleting object batch");
            self.store
                .delete_objects(bucket, batch)
                .await
                .map_err(TransferError::Store)?;
            deleted += batch.len() as u64;
            tally.advance(batch.len() as u64);
        }
        Ok(deleted)
    }
}

#[async_trait]
impl<S: ObjectStore> BucketTransfer for ReconcilingTransfer<S> {
    async fn sync_directory(
        &self,
        request: &SyncRequest,
        progress: ProgressSender,
    ) -> Result<TransferSummary, TransferError> {
        let bucket = request.bucket.as_str();
        let prefix = normalized_prefix(&request.prefix);
        info!(
            local_dir = %request.local_dir.display(),
            bucket,
            prefix = %prefix,
            "Starting directory sync"
        );

        let local = ensure_directory(&request.local_dir)
            .await
            .and_then(|()| scan_local(&request.local_dir, &prefix, request.options.follow_symlinks))
            .map_err(|e| {
                error!(local_dir = %request.local_dir.display(), error = %e, "Scanning local directory failed");
                e
            })?;

        let remote: HashMap<String, u64> = self
            .store
            .list_objects(bucket, &prefix)
            .await
            .map_err(TransferError::Store)?
            .into_iter()
            .map(|object| (object.key, object.size))
            .collect();

        let local_keys: HashSet<&str> = local.iter().map(|f| f.key.as_str()).collect();
        let mut stale: Vec<String> = if request.options.delete_removed {
            remote
                .keys()
                .filter(|key| !local_keys.contains(key.as_str()))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        stale.sort();

        info!(
            local_files = local.len(),
            remote_objects = remote.len(),
            stale = stale.len(),
            "Planned reconciliation"
        );

        let tally = Tally::start((local.len() + stale.len()) as u64, progress);
        let concurrency = request.options.max_concurrency.max(1);

        let operations: Vec<_> = local
            .iter()
            .map(|file| {
                let remote_size = remote.get(&file.key).copied();
                self.reconcile_counted(bucket, file, remote_size, &tally)
            })
            .collect();
        let actions: Vec<FileAction> = stream::iter(operations)
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;

        let deleted = self.delete_keys(bucket, &stale, &tally).await?;

        let mut summary = TransferSummary {
            deleted,
            ..TransferSummary::default()
        };
        for action in actions {
            match action {
                FileAction::Uploaded => summary.uploaded += 1,
                FileAction::Unchanged => summary.unchanged += 1,
            }
        }
        info!(
            bucket,
            uploaded = summary.uploaded,
            deleted = summary.deleted,
            unchanged = summary.unchanged,
            "Directory sync finished"
        );
        Ok(summary)
    }

    async fn delete_directory(
        &self,
        bucket: &str,
        prefix: &str,
        progress: ProgressSender,
    ) -> Result<TransferSummary, TransferError> {
        let prefix = normalized_prefix(prefix);
        info!(bucket, prefix = %prefix, "Deleting all objects under prefix");

        let keys: Vec<String> = self
            .store
            .list_objects(bucket, &prefix)
            .await
            .map_err(TransferError::Store)?
            .into_iter()
            .map(|object| object.key)
            .collect();

        let tally = Tally::start(keys.len() as u64, progress);
        let deleted = self.delete_keys(bucket, &keys, &tally).await?;

        info!(bucket, deleted, "Prefix deletion finished");
        Ok(TransferSummary {
            deleted,
            ..TransferSummary::default()
        })
    }
}
