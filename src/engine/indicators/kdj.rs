// =============================================================================
// KDJ — 9-bar stochastic with 2/3–1/3 smoothing
// =============================================================================
//
// RSV = (close − lowestLow) / (highestHigh − lowestLow) × 100 over the
// trailing 9 bars, defined as 0 when the window range degenerates below 1e-6.
// K and D are both seeded with the first eligible RSV; J = 3K − 2D and may
// legitimately leave [0, 100] in a strong trend.

use crate::engine::{round2, IndicatorValue, PricePoint};

const RSV_PERIOD: usize = 9;
const DEGENERATE_RANGE: f64 = 1e-6;

pub fn compute(prices: &[PricePoint], values: &mut [IndicatorValue]) {
    let n = prices.len();
    let mut k = vec![0.0f64; n];
    let mut d = vec![0.0f64; n];
    let mut j = vec![0.0f64; n];

    for i in 0..n {
        if i < RSV_PERIOD - 1 {
            continue;
        }

        let window = &prices[i + 1 - RSV_PERIOD..=i];
        let highest = window.iter().map(|p| p.high).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(|p| p.low).fold(f64::MAX, f64::min);

        let rsv = if (highest - lowest).abs() < DEGENERATE_RANGE {
            0.0
        } else {
            (prices[i].close - lowest) / (highest - lowest) * 100.0
        };

        if i == RSV_PERIOD - 1 {
            k[i] = rsv;
            d[i] = k[i];
        } else {
            k[i] = (2.0 / 3.0) * k[i - 1] + (1.0 / 3.0) * rsv;
            d[i] = (2.0 / 3.0) * d[i - 1] + (1.0 / 3.0) * k[i];
        }
        j[i] = 3.0 * k[i] - 2.0 * d[i];
    }

    for i in 0..n {
        values[i].kdj_k = round2(k[i]);
        values[i].kdj_d = round2(d[i]);
        values[i].kdj_j = round2(j[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::flat_bars;

    fn compute_for(prices: &[PricePoint]) -> Vec<IndicatorValue> {
        let mut values = vec![IndicatorValue::default(); prices.len()];
        compute(prices, &mut values);
        values
    }

    #[test]
    fn degenerate_range_yields_zero_without_nan() {
        // high == low on every bar: the window range is 0.
        let values = compute_for(&flat_bars(&[42.0; 15]));
        for v in &values {
            assert_eq!(v.kdj_k, 0.0);
            assert_eq!(v.kdj_d, 0.0);
            assert_eq!(v.kdj_j, 0.0);
        }
    }

    #[test]
    fn k_and_d_stay_bounded() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 30.0 + ((i * 17) % 23) as f64 - ((i * 5) % 11) as f64)
            .collect();
        let values = compute_for(&flat_bars(&closes));
        for v in &values {
            assert!((0.0..=100.0).contains(&v.kdj_k), "K out of range: {}", v.kdj_k);
            assert!((0.0..=100.0).contains(&v.kdj_d), "D out of range: {}", v.kdj_d);
        }
    }

    #[test]
    fn j_exceeds_band_in_a_strong_trend() {
        // Nine flat bars pin K = D = 0, then a hard rally drives RSV to 100
        // while D lags K — J must overshoot 100.
        let mut closes = vec![10.0; 9];
        closes.extend((1..=10).map(|i| 10.0 + i as f64));
        let values = compute_for(&flat_bars(&closes));
        let max_j = values.iter().map(|v| v.kdj_j).fold(f64::MIN, f64::max);
        assert!(max_j > 100.0, "expected J overshoot, max J = {max_j}");
    }

    #[test]
    fn seed_uses_first_eligible_rsv() {
        // Rising closes: at index 8 the close sits at the window top, so
        // RSV = 100 and both K and D are seeded there.
        let closes: Vec<f64> = (1..=12).map(|v| v as f64).collect();
        let values = compute_for(&flat_bars(&closes));
        assert_eq!(values[7].kdj_k, 0.0);
        assert_eq!(values[8].kdj_k, 100.0);
        assert_eq!(values[8].kdj_d, 100.0);
        assert_eq!(values[8].kdj_j, 100.0);
    }
}
