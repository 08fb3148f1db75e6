//! This module implements the CLI interface for bucket-sync: command parsing,
//! wiring of the AWS-backed collaborators, and the async entrypoint used by
//! both `main()` and the integration tests.
//!
//! All orchestration logic lives in [`crate::synchronise`] and
//! [`crate::hooks`]; this module only builds the services and routes
//! subcommands to actions.
//!
//! [`Cli`]: struct.Cli.html
//! [`run`]: fn.run.html

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::aws::{load_sdk_config, CloudFormationStackApi, S3ObjectStore};
use crate::console::ConsoleReporter;
use crate::contract::TransferOptions;
use crate::hooks::{dispatch, run_action, Action, Services};
use crate::load_config::{load_config, StackOverrides};
use crate::transfer::ReconcilingTransfer;

/// CLI for bucket-sync: sync local directories to the buckets of a deployed stack.
#[derive(Parser)]
#[clap(
    name = "bucket-sync",
    version,
    about = "Sync local directories to the S3 buckets of a deployed stack"
)]
pub struct Cli {
    /// Path to the deployment config file
    #[clap(long, global = true, default_value = "serverless.yml")]
    pub config: PathBuf,

    /// Deployment stage (overrides BUCKET_SYNC_STAGE and provider.stage)
    #[clap(long, global = true)]
    pub stage: Option<String>,

    /// AWS region (overrides provider.region and BUCKET_SYNC_REGION)
    #[clap(long, global = true)]
    pub region: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync the local directory to your deployed s3 bucket
    Sync,
    /// Fetches and prints out the deployed s3 buckets
    Info,
    /// Deletes all files from your s3 bucket
    Delete,
    /// Run the action bound to a deployment lifecycle event
    Hook {
        /// Event name, e.g. after:deploy:deploy
        event: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let overrides = StackOverrides {
        stage: cli.stage,
        region: cli.region,
    };
    let config = load_config(&cli.config, &overrides)?;

    let sdk_config = load_sdk_config(&config.stack.region).await;
    let stack_api = CloudFormationStackApi::new(&sdk_config);
    let transfer = ReconcilingTransfer::new(S3ObjectStore::new(&sdk_config));
    let reporter = ConsoleReporter::stdout();

    let services = Services {
        config: &config,
        stack_api: &stack_api,
        transfer: &transfer,
        reporter: &reporter,
        options: TransferOptions::default(),
    };

    let result = match cli.command {
        Commands::Sync => run_action(Action::Sync, &services).await,
        Commands::Info => run_action(Action::BucketInfo, &services).await,
        Commands::Delete => run_action(Action::Delete, &services).await,
        Commands::Hook { event } => dispatch(&event, &services).await,
    };

    match result {
        Ok(()) => {
            tracing::info!("Command completed");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            Err(anyhow::Error::new(e))
        }
    }
}
