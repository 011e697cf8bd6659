// =============================================================================
// Refresh Scheduler — daily bar sync with bounded fan-out
// =============================================================================
//
// Once per day, after the session has settled, every tracked instrument is
// refetched, merged into the series store, and fully re-analyzed. Fetches fan
// out concurrently but a semaphore caps how many run at once so the vendor is
// not hammered. One instrument failing never aborts the sweep.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveTime};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::engine;
use crate::providers::MarketProvider;
use crate::types::KlineType;

/// Fetch, store, and re-analyze one instrument. Returns the number of newly
/// inserted bars.
pub async fn sync_code(
    state: &AppState,
    provider: &dyn MarketProvider,
    code: &str,
    kline: KlineType,
) -> Result<usize> {
    let end = Local::now().date_naive();
    let bars = provider
        .bars(code, kline, end)
        .await
        .with_context(|| format!("fetching {kline} bars for {code} from {}", provider.name()))?;

    let inserted = state.store.upsert(code, kline, &bars);

    let series = state
        .store
        .get(code, kline)
        .unwrap_or_default();
    let analysis = engine::analyze(&series)
        .with_context(|| format!("analyzing {code} over {} bars", series.len()))?;
    state.put_analysis(code, kline, analysis);

    info!(code, %kline, inserted, total = series.len(), "instrument synced");
    Ok(inserted)
}

/// Refresh every configured instrument with bounded concurrency.
pub async fn sync_all(state: Arc<AppState>, provider: Arc<dyn MarketProvider>) {
    let (codes, max_concurrent) = {
        let config = state.runtime_config.read();
        (config.codes.clone(), config.max_concurrent_fetches.max(1))
    };

    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut handles = Vec::with_capacity(codes.len());

    for code in codes {
        let state = state.clone();
        let provider = provider.clone();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore never closed");
            if let Err(e) = sync_code(&state, provider.as_ref(), &code, KlineType::Day).await {
                warn!(%code, error = %e, "instrument sync failed");
                state.push_error(format!("{e:#}"), Some(code.clone()));
                return Err(());
            }
            Ok(())
        }));
    }

    let mut failures = 0usize;
    let total = handles.len();
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            _ => failures += 1,
        }
    }

    if failures == 0 {
        state.mark_sync_ok();
        info!(instruments = total, "refresh sweep complete");
    } else {
        state.mark_sync_error(format!("{failures} of {total} instruments failed to sync"));
        warn!(failures, total, "refresh sweep finished with failures");
    }
}

/// Run forever: sync immediately on startup, then once per day at the
/// configured refresh hour.
pub async fn run_refresh_loop(state: Arc<AppState>, provider: Arc<dyn MarketProvider>) {
    sync_all(state.clone(), provider.clone()).await;

    loop {
        let refresh_hour = state.runtime_config.read().refresh_hour.min(23);
        let sleep_for = until_next_run(refresh_hour);
        info!(in_secs = sleep_for.as_secs(), "next refresh scheduled");
        tokio::time::sleep(sleep_for).await;

        sync_all(state.clone(), provider.clone()).await;
    }
}

/// Duration until the next local occurrence of `hour`:00.
fn until_next_run(hour: u32) -> std::time::Duration {
    let now = Local::now();
    let target_time = NaiveTime::from_hms_opt(hour, 0, 0).expect("hour clamped to 0..=23");
    let today_target = now.date_naive().and_time(target_time);

    let next = if now.naive_local() < today_target {
        today_target
    } else {
        today_target + chrono::Duration::days(1)
    };

    (next - now.naive_local())
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(60))
}
