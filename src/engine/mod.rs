// =============================================================================
// Technical-Analysis Engine
// =============================================================================
//
// Pure, synchronous, single-threaded analysis over one chronological bar
// sequence per instrument. Three layers, each consuming the previous one's
// output:
//
//   1. indicators — array-to-array transforms (MA, Bollinger, MACD, KDJ)
//   2. runs + fractal — structural decomposition of the raw price path
//   3. pivot + divergence — consolidation zones and momentum-exhaustion points
//
// The engine owns no I/O and no shared state; it is safe to call concurrently
// across instruments. Insufficient history never raises an error — fields stay
// at the sentinel 0 until their warm-up window has elapsed.
// =============================================================================

pub mod divergence;
pub mod fractal;
pub mod indicators;
pub mod pivot;
pub mod runs;
pub mod suggest;

use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::engine::divergence::DivergencePoint;
use crate::engine::fractal::Fractal;
use crate::engine::pivot::PivotZone;
use crate::engine::runs::DirectionalRun;

// ---------------------------------------------------------------------------
// Bar + indicator types
// ---------------------------------------------------------------------------

/// One OHLC + traded-amount bar. Immutable once ingested; sequences handed to
/// the engine must be strictly ascending by `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Traded amount (currency volume) for the bar.
    pub amount: f64,
}

/// Per-bar indicator readings. A value of exactly 0 before an indicator's
/// warm-up window means "not yet computed", never a real reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorValue {
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub ma30: f64,
    pub ma60: f64,
    pub boll_mid: f64,
    pub boll_up: f64,
    pub boll_down: f64,
    pub macd_dif: f64,
    pub macd_dea: f64,
    pub kdj_k: f64,
    pub kdj_d: f64,
    pub kdj_j: f64,
}

impl IndicatorValue {
    /// MACD histogram value (dif − dea). Positive bars are "red", negative
    /// bars "green" in the conventional rendering.
    pub fn macd_histogram(&self) -> f64 {
        self.macd_dif - self.macd_dea
    }

    /// Copy with every field rounded for publication.
    pub fn rounded(&self) -> IndicatorValue {
        IndicatorValue {
            ma5: round2(self.ma5),
            ma10: round2(self.ma10),
            ma20: round2(self.ma20),
            ma30: round2(self.ma30),
            ma60: round2(self.ma60),
            boll_mid: round2(self.boll_mid),
            boll_up: round2(self.boll_up),
            boll_down: round2(self.boll_down),
            macd_dif: round2(self.macd_dif),
            macd_dea: round2(self.macd_dea),
            kdj_k: round2(self.kdj_k),
            kdj_d: round2(self.kdj_d),
            kdj_j: round2(self.kdj_j),
        }
    }
}

/// Round to two decimal places, half away from zero. All published indicator
/// values go through this.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Full-analysis entry points
// ---------------------------------------------------------------------------

/// Structural decomposition of one price path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendAnalysis {
    pub runs: Vec<DirectionalRun>,
    pub fractals: Vec<Fractal>,
    pub pivots: Vec<PivotZone>,
    pub divergences: Vec<DivergencePoint>,
}

/// Everything the engine derives from one bar sequence.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub indicators: Vec<IndicatorValue>,
    pub trend: TrendAnalysis,
}

/// Caller-contract precondition: a non-empty, strictly ascending sequence.
/// This is the only way the engine can fail.
pub fn ensure_chronological(prices: &[PricePoint]) -> Result<()> {
    if prices.is_empty() {
        bail!("empty price sequence");
    }
    for pair in prices.windows(2) {
        if pair[1].date <= pair[0].date {
            bail!(
                "price sequence not strictly ascending at {} -> {}",
                pair[0].date,
                pair[1].date
            );
        }
    }
    Ok(())
}

/// Compute every indicator family for the sequence. Same-length output,
/// sentinel 0 before each warm-up window.
pub fn compute_indicators(prices: &[PricePoint]) -> Vec<IndicatorValue> {
    let mut values = vec![IndicatorValue::default(); prices.len()];
    indicators::ma::compute(prices, &mut values);
    indicators::bollinger::compute(prices, &mut values);
    indicators::macd::compute(prices, &mut values);
    indicators::kdj::compute(prices, &mut values);
    values
}

/// Decompose the price path into runs, fractals, pivot zones and divergence
/// points. `indicators` must be the output of [`compute_indicators`] for the
/// same sequence (the divergence layer reads the MACD series).
pub fn analyze_trend(prices: &[PricePoint], indicators: &[IndicatorValue]) -> TrendAnalysis {
    let raw = runs::directional_runs(prices);
    let collapsed = runs::collapse_noise(prices, raw);
    let fractals = fractal::classify(prices, &collapsed);
    let pivots = pivot::pivot_zones(prices, &fractals);
    let divergences = divergence::divergence_points(prices, indicators, &fractals, &pivots);
    TrendAnalysis {
        runs: collapsed,
        fractals,
        pivots,
        divergences,
    }
}

/// Run the full pipeline over one chronological sequence.
pub fn analyze(prices: &[PricePoint]) -> Result<Analysis> {
    ensure_chronological(prices)?;
    let indicators = compute_indicators(prices);
    let trend = analyze_trend(prices, &indicators);
    Ok(Analysis { indicators, trend })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_half_away_from_zero() {
        assert_eq!(round2(0.005), 0.01);
        assert_eq!(round2(-0.005), -0.01);
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(2.346), 2.35);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(analyze(&[]).is_err());
    }

    #[test]
    fn rejects_non_chronological_input() {
        let mut prices = testutil::flat_bars(&[1.0, 2.0, 3.0]);
        prices.swap(0, 2);
        assert!(analyze(&prices).is_err());
    }

    #[test]
    fn analysis_is_idempotent() {
        let closes: Vec<f64> = (0..80).map(|i| 10.0 + ((i * 7) % 13) as f64 * 0.3).collect();
        let prices = testutil::flat_bars(&closes);
        let first = compute_indicators(&prices);
        let second = compute_indicators(&prices);
        assert_eq!(first, second);
    }
}
