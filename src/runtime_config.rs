// =============================================================================
// Runtime Configuration — Hot-reloadable service settings with atomic save
// =============================================================================
//
// Central configuration hub for the analysis service. Every tunable lives here
// so the service can be reconfigured at runtime without a restart.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields never
// breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::providers::ProviderKind;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_codes() -> Vec<String> {
    vec![
        "SH600036".to_string(),
        "SH601318".to_string(),
        "SZ000858".to_string(),
    ]
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_refresh_hour() -> u32 {
    17
}

fn default_fetch_limit() -> usize {
    365
}

fn default_vendor_cookies() -> Vec<String> {
    vec![String::new()]
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the analysis service.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Which market-data provider handles fetches by default.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Instrument codes the service tracks and refreshes.
    #[serde(default = "default_codes")]
    pub codes: Vec<String>,

    /// Maximum number of instruments fetched concurrently during a refresh.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Local hour (24h clock) at which the daily refresh runs. The mainland
    /// session closes at 15:00; 17:00 leaves room for vendor settlement.
    #[serde(default = "default_refresh_hour")]
    pub refresh_hour: u32,

    /// How many trailing bars to request per fetch.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,

    /// Session cookies rotated across vendor kline requests. An empty string
    /// means an anonymous request.
    #[serde(default = "default_vendor_cookies")]
    pub vendor_cookies: Vec<String>,

    /// Authenticated token for the Xueqiu endpoints, if configured.
    #[serde(default)]
    pub xueqiu_token: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            codes: default_codes(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            refresh_hour: default_refresh_hour(),
            fetch_limit: default_fetch_limit(),
            vendor_cookies: default_vendor_cookies(),
            xueqiu_token: String::new(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            codes = ?config.codes,
            provider = %config.provider,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    ///
    /// This prevents corruption if the process crashes mid-write.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        // Atomic write: write to a temporary sibling file, then rename.
        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}
