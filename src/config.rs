use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contract::SyncTarget;

/// Fully merged runtime configuration: the static target list from the
/// config file plus the API credential injected from the environment.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Integration token for the workspace API. `None` means unconfigured;
    /// a full sync run will short-circuit without side effects.
    pub api_key: Option<String>,
    pub targets: Vec<SyncTarget>,
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            has_api_key = self.api_key.is_some(),
            targets_count = self.targets.len(),
            "Loaded Config"
        );
        debug!(targets = ?self.targets, "Config loaded (full debug)");
    }
}
