// bucket-sync/src/config.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::stack::StackContext;

/// One configured sync target, as declared under `custom.syncS3Buckets`.
///
/// Every field is optional at parse time; the resolver decides what is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTarget {
    #[serde(default)]
    pub local_dir: Option<String>,
    #[serde(default)]
    pub bucket_name: Option<String>,
    /// Logical id of a bucket in the deployed stack.
    #[serde(default)]
    pub bucket_ref: Option<String>,
    #[serde(default)]
    pub bucket_prefix: Option<String>,
}

/// Everything a run needs from the deployment configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root; `localDir` entries are relative to it.
    pub service_path: PathBuf,
    pub stack: StackContext,
    pub targets: Vec<SyncTarget>,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            service = %self.stack.service,
            stage = %self.stack.stage,
            region = %self.stack.region,
            service_path = %self.service_path.display(),
            targets_count = self.targets.len(),
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}
