// =============================================================================
// MACD — EMA(12) / EMA(26) / signal EMA(9)
// =============================================================================
//
// Both price EMAs are seeded with the simple average of their first `period`
// closes, placed at index period−1. The signal line is seeded with the dif
// series' own first value instead of an SMA — the asymmetry is deliberate and
// affects early-window values, so it must not be "normalised" away.
//
// dif carries the sentinel 0 until the 26-bar lookback has elapsed; the short
// EMA alone is not a MACD reading.

use crate::engine::{round2, IndicatorValue, PricePoint};

const SHORT_PERIOD: usize = 12;
const LONG_PERIOD: usize = 26;
const SIGNAL_PERIOD: usize = 9;

pub fn compute(prices: &[PricePoint], values: &mut [IndicatorValue]) {
    let n = prices.len();
    let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();

    let ema12 = ema(&closes, SHORT_PERIOD, true);
    let ema26 = ema(&closes, LONG_PERIOD, true);

    let mut dif = vec![0.0f64; n];
    for i in (LONG_PERIOD - 1).min(n)..n {
        dif[i] = ema12[i] - ema26[i];
    }

    let dea = ema(&dif, SIGNAL_PERIOD, false);

    for i in 0..n {
        values[i].macd_dif = round2(dif[i]);
        values[i].macd_dea = round2(dea[i]);
    }
}

/// Exponential moving average with the smoothing factor 2/(period+1).
///
/// The seed lands at index `period − 1`: the SMA of the first `period` values
/// when `seed_with_sma` is set, otherwise the series' first value. Indices
/// before the seed stay 0.
fn ema(data: &[f64], period: usize, seed_with_sma: bool) -> Vec<f64> {
    let mut out = vec![0.0f64; data.len()];
    if data.len() < period {
        return out;
    }

    let seed = if seed_with_sma {
        data[..period].iter().sum::<f64>() / period as f64
    } else {
        data[0]
    };

    let multiplier = 2.0 / (period as f64 + 1.0);
    out[period - 1] = seed;
    for i in period..data.len() {
        out[i] = (data[i] - out[i - 1]) * multiplier + out[i - 1];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::flat_bars;

    fn compute_for(closes: &[f64]) -> Vec<IndicatorValue> {
        let prices = flat_bars(closes);
        let mut values = vec![IndicatorValue::default(); prices.len()];
        compute(&prices, &mut values);
        values
    }

    #[test]
    fn constant_input_yields_zero_dif_after_short_seed() {
        let values = compute_for(&[25.0; 40]);
        for (i, v) in values.iter().enumerate().skip(11) {
            assert_eq!(v.macd_dif, 0.0, "dif nonzero at {i}");
            assert_eq!(v.macd_dea, 0.0, "dea nonzero at {i}");
        }
    }

    #[test]
    fn dif_sentinel_until_long_lookback() {
        let closes: Vec<f64> = (0..50).map(|i| 10.0 + i as f64 * 0.5).collect();
        let values = compute_for(&closes);
        for v in &values[..LONG_PERIOD - 1] {
            assert_eq!(v.macd_dif, 0.0);
        }
        // A steady uptrend puts the short EMA above the long one.
        assert!(values[LONG_PERIOD - 1].macd_dif > 0.0);
        assert!(values[49].macd_dif > 0.0);
    }

    #[test]
    fn downtrend_turns_dif_negative() {
        let closes: Vec<f64> = (0..50).map(|i| 60.0 - i as f64 * 0.8).collect();
        let values = compute_for(&closes);
        assert!(values[49].macd_dif < 0.0);
        assert!(values[49].macd_dea < 0.0);
    }

    #[test]
    fn signal_lags_dif_in_a_trend() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let values = compute_for(&closes);
        // In a persistent uptrend the slower signal line stays below dif.
        let v = &values[59];
        assert!(v.macd_dif >= v.macd_dea);
    }

    #[test]
    fn ema_seed_placement() {
        let data: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let sma_seeded = ema(&data, 5, true);
        assert_eq!(sma_seeded[3], 0.0);
        assert_eq!(sma_seeded[4], 3.0); // avg of 1..=5

        let first_seeded = ema(&data, 5, false);
        assert_eq!(first_seeded[4], 1.0);
    }
}
