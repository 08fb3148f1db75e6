//! Command surface exposed to the deployment tool: the three actions and the
//! lifecycle events that trigger them.

use std::fmt;

use tracing::{info, warn};

use crate::config::Config;
use crate::contract::{BucketTransfer, Reporter, StackApi, TransferOptions};
use crate::error::SyncError;
use crate::synchronise::{print_bucket_inventory, remove_all, synchronise};

/// One invocable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Sync,
    BucketInfo,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Sync => "sync",
            Action::BucketInfo => "info",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A named command with its usage text and lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub lifecycle_event: &'static str,
    pub action: Action,
}

pub const COMMANDS: [CommandSpec; 3] = [
    CommandSpec {
        name: "syncToS3",
        usage: "Sync the local directory to your deployed s3 bucket",
        lifecycle_event: "sync",
        action: Action::Sync,
    },
    CommandSpec {
        name: "s3info",
        usage: "Fetches and prints out the deployed s3 buckets",
        lifecycle_event: "s3BucketInfo",
        action: Action::BucketInfo,
    },
    CommandSpec {
        name: "deleteFromS3",
        usage: "Deletes all files from your s3 bucket",
        lifecycle_event: "rm",
        action: Action::Delete,
    },
];

pub const AFTER_DEPLOY: &str = "after:deploy:deploy";
pub const AFTER_INFO: &str = "after:aws:info:displayStackOutputs";

/// How a hooked action treats its own failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Propagate,
    /// Log, print a warning notice, and report success.
    LogAndContinue,
}

/// Action bound to a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hook {
    pub action: Action,
    pub on_failure: FailurePolicy,
}

/// Look up the hook for a lifecycle event name such as `after:deploy:deploy`
/// or `syncToS3:sync`.
pub fn hook_for(event: &str) -> Result<Hook, SyncError> {
    match event {
        AFTER_DEPLOY => Ok(Hook {
            action: Action::Sync,
            on_failure: FailurePolicy::Propagate,
        }),
        AFTER_INFO => Ok(Hook {
            action: Action::BucketInfo,
            on_failure: FailurePolicy::LogAndContinue,
        }),
        _ => COMMANDS
            .iter()
            .find(|c| format!("{}:{}", c.name, c.lifecycle_event) == event)
            .map(|c| Hook {
                action: c.action,
                on_failure: FailurePolicy::Propagate,
            })
            .ok_or_else(|| SyncError::UnknownHook(event.to_string())),
    }
}

/// Everything an action runs against.
pub struct Services<'a, A: ?Sized, T: ?Sized> {
    pub config: &'a Config,
    pub stack_api: &'a A,
    pub transfer: &'a T,
    pub reporter: &'a dyn Reporter,
    pub options: TransferOptions,
}

/// Run one action, propagating its failure.
pub async fn run_action<A, T>(action: Action, services: &Services<'_, A, T>) -> Result<(), SyncError>
where
    A: StackApi + ?Sized,
    T: BucketTransfer + ?Sized,
{
    info!(%action, "Running action");
    match action {
        Action::Sync => synchronise(
            services.config,
            services.stack_api,
            services.transfer,
            services.reporter,
            &services.options,
        )
        .await
        .map(|_| ()),
        Action::BucketInfo => {
            print_bucket_inventory(services.config, services.stack_api, services.reporter).await
        }
        Action::Delete => remove_all(
            services.config,
            services.stack_api,
            services.transfer,
            services.reporter,
        )
        .await
        .map(|_| ()),
    }
}

/// Dispatch a lifecycle event to its action, applying the hook's failure policy.
pub async fn dispatch<A, T>(event: &str, services: &Services<'_, A, T>) -> Result<(), SyncError>
where
    A: StackApi + ?Sized,
    T: BucketTransfer + ?Sized,
{
    let hook = hook_for(event)?;
    info!(event, action = %hook.action, "Dispatching lifecycle event");
    match (run_action(hook.action, services).await, hook.on_failure) {
        (Err(e), FailurePolicy::LogAndContinue) => {
            warn!(event, error = %e, "Hooked action failed; continuing");
            services
                .reporter
                .notice(&format!("Could not complete {}: {e}", hook.action));
            Ok(())
        }
        (result, _) => result,
    }
}
