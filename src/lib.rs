#![doc = "bucket-sync: sync local directories to the S3 buckets of a deployed stack."]

//! Targets are declared in the deployment configuration and may name a
//! bucket directly or refer to it by its logical id in the stack; logical ids
//! are resolved against the live stack inventory at run time.
//!
//! # Layout
//! - [`contract`]: collaborator traits (stack API, object store, transfer, reporter)
//! - [`resolve`] and [`stack`]: target validation and logical id resolution
//! - [`transfer`]: the reconciling sync/delete engine
//! - [`synchronise`]: the sequential, fail-fast orchestration
//! - [`hooks`]: commands and lifecycle events exposed to the deployment tool
//! - [`aws`]: AWS SDK adapters; [`cli`]: the command line

pub mod aws;
pub mod cli;
pub mod config;
pub mod console;
pub mod contract;
pub mod error;
pub mod hooks;
pub mod load_config;
pub mod progress;
pub mod resolve;
pub mod stack;
pub mod synchronise;
pub mod transfer;

pub use cli::{run, Cli, Commands};
pub use error::{SyncError, TransferError};
