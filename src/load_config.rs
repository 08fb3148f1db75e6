//! `load_config` module: reads the deployment configuration file and maps it
//! to the internal [`Config`].
//!
//! The file belongs to the deployment tool, so only the keys this crate
//! needs are read (`service`, `provider.stage`, `provider.region`,
//! `custom.syncS3Buckets`) and everything else is ignored. Sync targets are
//! parsed leniently; validating them is the resolver's job, so that a bad
//! entry surfaces as an invalid-configuration error for that entry at run
//! time.
//!
//! The stage is taken, in order, from the explicit override, the
//! `BUCKET_SYNC_STAGE` environment variable, `provider.stage`, and `dev`.
//! The region is taken from the explicit override, `provider.region`, the
//! `BUCKET_SYNC_REGION` environment variable, and `us-east-1`. The ambient
//! `AWS_REGION` is never consulted, so a CI runner's region cannot redirect
//! a stack declared elsewhere.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::{Config, SyncTarget};
use crate::stack::StackContext;

pub const DEFAULT_STAGE: &str = "dev";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const STAGE_ENV: &str = "BUCKET_SYNC_STAGE";
pub const REGION_ENV: &str = "BUCKET_SYNC_REGION";
pub const TARGETS_KEY: &str = "syncS3Buckets";

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct StackOverrides {
    pub stage: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServiceName {
    Plain(String),
    Named { name: String },
}

#[derive(Debug, Default, Deserialize)]
struct ProviderSection {
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    service: ServiceName,
    #[serde(default)]
    provider: ProviderSection,
    #[serde(default)]
    custom: Option<serde_yaml::Value>,
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn resolve_stage(explicit: &Option<String>, file: &Option<String>) -> String {
    explicit
        .clone()
        .or_else(|| env_value(STAGE_ENV))
        .or_else(|| file.clone())
        .unwrap_or_else(|| DEFAULT_STAGE.to_string())
}

fn resolve_region(explicit: &Option<String>, file: &Option<String>) -> String {
    explicit
        .clone()
        .or_else(|| file.clone())
        .or_else(|| env_value(REGION_ENV))
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

fn parse_targets(custom: Option<&serde_yaml::Value>) -> Vec<SyncTarget> {
    let Some(entries) = custom
        .and_then(|c| c.get(TARGETS_KEY))
        .and_then(serde_yaml::Value::as_sequence)
    else {
        info!("No custom.{TARGETS_KEY} sequence in config");
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_yaml::from_value::<SyncTarget>(entry.clone()).unwrap_or_else(|e| {
                warn!(index, error = %e, "Unreadable sync target entry; it will fail validation");
                SyncTarget::default()
            })
        })
        .collect()
}

/// Loads the deployment configuration file and applies stage/region overrides.
pub fn load_config<P: AsRef<Path>>(path: P, overrides: &StackOverrides) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            e
        })
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let service = match raw.service {
        ServiceName::Plain(name) | ServiceName::Named { name } => name,
    };
    if service.trim().is_empty() {
        anyhow::bail!("Config field 'service' must not be empty");
    }

    let stack = StackContext {
        service,
        stage: resolve_stage(&overrides.stage, &raw.provider.stage),
        region: resolve_region(&overrides.region, &raw.provider.region),
    };

    let service_path = match path_ref.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let config = Config {
        service_path,
        stack,
        targets: parse_targets(raw.custom.as_ref()),
    };
    config.trace_loaded();
    Ok(config)
}
