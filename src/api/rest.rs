// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. The service is read-mostly: analysis
// endpoints serve from the cache the scheduler maintains, falling back to an
// on-demand computation when the cache is cold but bars exist. `/sync`
// triggers a refresh without waiting for the daily sweep.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app_state::AppState;
use crate::engine::suggest::{suggest_all, SuggestionSet};
use crate::engine::{self, IndicatorValue};
use crate::providers::MarketProvider;
use crate::scheduler;
use crate::types::KlineType;

/// Shared handler context: application state plus the market-data provider
/// used by on-demand syncs.
#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<AppState>,
    pub provider: Arc<dyn MarketProvider>,
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(ctx: ApiContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/codes", get(codes))
        .route("/api/v1/analyze/indicator", post(analyze_indicator))
        .route("/api/v1/analyze/trend", post(analyze_trend))
        .route("/api/v1/sync", post(sync))
        .layer(cors)
        .with_state(ctx)
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn not_found(message: String) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": message })),
    )
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_s: u64,
    last_sync_age_s: Option<u64>,
    last_sync_error: Option<String>,
}

async fn health(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let state = &ctx.state;
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_s: state.start_time.elapsed().as_secs(),
        last_sync_age_s: state.last_sync_ok.read().map(|t| t.elapsed().as_secs()),
        last_sync_error: state.last_sync_error.read().clone(),
    };
    Json(resp)
}

// =============================================================================
// Codes
// =============================================================================

async fn codes(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let configured = ctx.state.runtime_config.read().codes.clone();
    let synced = ctx.state.store.codes();
    Json(serde_json::json!({
        "configured": configured,
        "synced": synced,
    }))
}

// =============================================================================
// Indicator analysis
// =============================================================================

fn default_indicator_limit() -> usize {
    30
}

/// Which suggestion analyzer(s) the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
enum Strategy {
    Ma,
    Bolling,
    Macd,
    Kdj,
    #[default]
    All,
}

#[derive(Deserialize)]
struct IndicatorRequest {
    code: String,
    #[serde(default)]
    kline: KlineType,
    #[serde(default)]
    strategy: Strategy,
    /// How many trailing bars to return.
    #[serde(default = "default_indicator_limit")]
    limit: usize,
}

fn select_suggestions(set: &SuggestionSet, strategy: Strategy) -> serde_json::Value {
    match strategy {
        Strategy::Ma => serde_json::json!({ "ma": set.ma }),
        Strategy::Bolling => serde_json::json!({ "bolling": set.bolling }),
        Strategy::Macd => serde_json::json!({ "macd": set.macd }),
        Strategy::Kdj => serde_json::json!({ "kdj": set.kdj }),
        Strategy::All => serde_json::to_value(set).unwrap_or_default(),
    }
}

#[derive(Serialize)]
struct IndicatorRow {
    date: String,
    close: f64,
    #[serde(flatten)]
    value: IndicatorValue,
}

#[derive(Serialize)]
struct IndicatorResponse {
    code: String,
    kline: KlineType,
    bar_count: usize,
    values: Vec<IndicatorRow>,
    suggestions: serde_json::Value,
}

async fn analyze_indicator(
    State(ctx): State<ApiContext>,
    Json(req): Json<IndicatorRequest>,
) -> Result<Json<IndicatorResponse>, ApiError> {
    let Some(prices) = ctx.state.store.get(&req.code, req.kline) else {
        return Err(not_found(format!(
            "no {} bars synced for {}",
            req.kline, req.code
        )));
    };

    let analysis = match ctx.state.get_analysis(&req.code, req.kline) {
        Some(cached) if cached.bar_count == prices.len() => cached.analysis,
        // Cold or stale cache: recompute and keep the result.
        _ => {
            let analysis = engine::analyze(&prices)
                .map_err(|e| not_found(format!("cannot analyze {}: {e}", req.code)))?;
            ctx.state
                .put_analysis(&req.code, req.kline, analysis.clone());
            Arc::new(analysis)
        }
    };

    let suggestions = select_suggestions(&suggest_all(&prices, &analysis.indicators), req.strategy);

    let start = prices.len().saturating_sub(req.limit.max(1));
    let values = prices[start..]
        .iter()
        .zip(&analysis.indicators[start..])
        .map(|(bar, value)| IndicatorRow {
            date: bar.date.format("%Y-%m-%d %H:%M").to_string(),
            close: bar.close,
            value: value.rounded(),
        })
        .collect();

    Ok(Json(IndicatorResponse {
        code: req.code,
        kline: req.kline,
        bar_count: prices.len(),
        values,
        suggestions,
    }))
}

// =============================================================================
// Trend analysis
// =============================================================================

#[derive(Deserialize)]
struct TrendRequest {
    code: String,
    #[serde(default)]
    kline: KlineType,
}

async fn analyze_trend(
    State(ctx): State<ApiContext>,
    Json(req): Json<TrendRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(prices) = ctx.state.store.get(&req.code, req.kline) else {
        return Err(not_found(format!(
            "no {} bars synced for {}",
            req.kline, req.code
        )));
    };

    let analysis = match ctx.state.get_analysis(&req.code, req.kline) {
        Some(cached) if cached.bar_count == prices.len() => cached.analysis,
        _ => {
            let analysis = engine::analyze(&prices)
                .map_err(|e| not_found(format!("cannot analyze {}: {e}", req.code)))?;
            ctx.state
                .put_analysis(&req.code, req.kline, analysis.clone());
            Arc::new(analysis)
        }
    };

    let trend = &analysis.trend;
    let signals: Vec<serde_json::Value> = trend
        .divergences
        .iter()
        .map(|p| {
            serde_json::json!({
                "index": p.index,
                "date": prices[p.index].date.format("%Y-%m-%d %H:%M").to_string(),
                "kind": p.kind.to_string(),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "code": req.code,
        "kline": req.kline,
        "bar_count": prices.len(),
        "runs": trend.runs,
        "fractals": trend.fractals,
        "pivots": trend.pivots,
        "signals": signals,
    })))
}

// =============================================================================
// Sync trigger
// =============================================================================

#[derive(Deserialize)]
struct SyncRequest {
    /// Sync only this instrument; omitted means every configured one.
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    kline: KlineType,
}

async fn sync(
    State(ctx): State<ApiContext>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match req.code {
        Some(code) => {
            let inserted =
                scheduler::sync_code(&ctx.state, ctx.provider.as_ref(), &code, req.kline)
                    .await
                    .map_err(|e| {
                        ctx.state.push_error(format!("{e:#}"), Some(code.clone()));
                        not_found(format!("sync failed for {code}: {e:#}"))
                    })?;
            info!(%code, inserted, "manual sync complete");
            Ok(Json(serde_json::json!({
                "code": code,
                "inserted": inserted,
            })))
        }
        None => {
            // Full sweep runs in the background; poll /health for the outcome.
            let state = ctx.state.clone();
            let provider = ctx.provider.clone();
            tokio::spawn(async move {
                scheduler::sync_all(state, provider).await;
            });
            info!("full refresh sweep triggered via API");
            Ok(Json(serde_json::json!({ "status": "sweep started" })))
        }
    }
}
