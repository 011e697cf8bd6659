// =============================================================================
// StockLens — technical-analysis service for equity price series
// =============================================================================
//
// Library surface: the pure analysis engine plus the service plumbing around
// it (providers, series store, scheduler, HTTP API).

pub mod api;
pub mod app_state;
pub mod engine;
pub mod providers;
pub mod runtime_config;
pub mod scheduler;
pub mod series_store;
pub mod types;
