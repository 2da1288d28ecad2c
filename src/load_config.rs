use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::contract::{SyncTarget, TargetKind};

/// Environment variable holding the workspace integration token.
pub const API_KEY_ENV: &str = "NOTION_API_KEY";

#[derive(Deserialize)]
struct StaticConfig {
    #[serde(default)]
    targets: Vec<TargetYaml>,
}

#[derive(Deserialize)]
struct TargetYaml {
    remote_id: String,
    kind: TargetKind,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Loads a static YAML config file (no secrets) and injects the API key
/// from the environment. A missing key is not an error here: the run itself
/// short-circuits with a credential fault, which keeps config loading usable
/// for read-only commands.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => {
            info!("{API_KEY_ENV} found in env");
            Some(key)
        }
        _ => {
            warn!("{API_KEY_ENV} not set; sync runs will fail until it is configured");
            None
        }
    };

    let targets: Vec<SyncTarget> = static_conf
        .targets
        .into_iter()
        .map(|t| {
            info!(remote_id = %t.remote_id, kind = ?t.kind, enabled = t.enabled, "Parsed sync target from config");
            SyncTarget {
                remote_id: t.remote_id,
                kind: t.kind,
                enabled: t.enabled,
            }
        })
        .collect();

    info!(targets = targets.len(), "Config loaded and merged successfully");

    Ok(SyncConfig { api_key, targets })
}
