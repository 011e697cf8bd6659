// =============================================================================
// Central Application State
// =============================================================================
//
// The single source of truth for the service. All async tasks share one
// `Arc<AppState>`: the API handlers read from it, the refresh scheduler writes
// into it.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
//   - SeriesStore manages its own interior mutability.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::engine::Analysis;
use crate::runtime_config::RuntimeConfig;
use crate::series_store::SeriesStore;
use crate::types::KlineType;

// =============================================================================
// Records
// =============================================================================

/// A recorded error event for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Instrument the error relates to, when there is one.
    pub code: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// One instrument's cached analysis plus when it was computed.
#[derive(Clone)]
pub struct CachedAnalysis {
    pub code: String,
    pub kline: KlineType,
    pub bar_count: usize,
    pub computed_at: String,
    pub analysis: Arc<Analysis>,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, incremented on every
    /// meaningful state mutation.
    pub state_version: AtomicU64,

    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    /// Raw bar series per instrument and granularity.
    pub store: Arc<SeriesStore>,

    /// Latest full analysis per (code, granularity).
    pub analyses: RwLock<HashMap<(String, KlineType), CachedAnalysis>>,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Outcome of the most recent refresh sweep.
    pub last_sync_ok: RwLock<Option<std::time::Instant>>,
    pub last_sync_error: RwLock<Option<String>>,

    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given runtime configuration. The
    /// returned value is typically wrapped in `Arc` immediately.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            store: Arc::new(SeriesStore::new()),
            analyses: RwLock::new(HashMap::new()),
            recent_errors: RwLock::new(Vec::new()),
            last_sync_ok: RwLock::new(None),
            last_sync_error: RwLock::new(None),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version. Call this after every
    /// meaningful mutation.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, msg: String, code: Option<String>) {
        let record = ErrorRecord {
            message: msg,
            code,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    // ── Analysis Cache ──────────────────────────────────────────────────

    /// Cache a freshly computed analysis for an instrument.
    pub fn put_analysis(&self, code: &str, kline: KlineType, analysis: Analysis) {
        let cached = CachedAnalysis {
            code: code.to_string(),
            kline,
            bar_count: analysis.indicators.len(),
            computed_at: Utc::now().to_rfc3339(),
            analysis: Arc::new(analysis),
        };
        self.analyses
            .write()
            .insert((code.to_string(), kline), cached);
        self.increment_version();
    }

    /// The cached analysis for an instrument, if one has been computed.
    pub fn get_analysis(&self, code: &str, kline: KlineType) -> Option<CachedAnalysis> {
        self.analyses
            .read()
            .get(&(code.to_string(), kline))
            .cloned()
    }

    // ── Sync Status ─────────────────────────────────────────────────────

    pub fn mark_sync_ok(&self) {
        *self.last_sync_ok.write() = Some(std::time::Instant::now());
        *self.last_sync_error.write() = None;
        self.increment_version();
    }

    pub fn mark_sync_error(&self, message: String) {
        *self.last_sync_error.write() = Some(message);
        self.increment_version();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{analyze, testutil::flat_bars};

    #[test]
    fn version_counter_increments() {
        let state = AppState::new(RuntimeConfig::default());
        let before = state.current_state_version();
        state.increment_version();
        assert_eq!(state.current_state_version(), before + 1);
    }

    #[test]
    fn error_ring_is_capped() {
        let state = AppState::new(RuntimeConfig::default());
        for i in 0..60 {
            state.push_error(format!("error {i}"), None);
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        // Oldest entries evicted first.
        assert_eq!(errors[0].message, "error 10");
    }

    #[test]
    fn analysis_cache_round_trips() {
        let state = AppState::new(RuntimeConfig::default());
        let closes: Vec<f64> = (0..40).map(|i| 10.0 + i as f64 * 0.1).collect();
        let analysis = analyze(&flat_bars(&closes)).unwrap();

        state.put_analysis("SH600000", KlineType::Day, analysis);
        let cached = state.get_analysis("SH600000", KlineType::Day).unwrap();
        assert_eq!(cached.bar_count, 40);
        assert!(state.get_analysis("SH600000", KlineType::Min30).is_none());
    }

    #[test]
    fn sync_status_transitions() {
        let state = AppState::new(RuntimeConfig::default());
        state.mark_sync_error("vendor timeout".into());
        assert!(state.last_sync_error.read().is_some());
        state.mark_sync_ok();
        assert!(state.last_sync_error.read().is_none());
        assert!(state.last_sync_ok.read().is_some());
    }
}
