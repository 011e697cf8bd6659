// =============================================================================
// Bollinger Bands — 20-bar, population variance, ±2σ
// =============================================================================
//
// The middle band reuses the published MA20 (already rounded), so Bollinger
// must run after the moving-average pass. σ is the population standard
// deviation of the trailing 20 closes around that mid value.

use crate::engine::{round2, IndicatorValue, PricePoint};

const PERIOD: usize = 20;
const BAND_WIDTH: f64 = 2.0;

pub fn compute(prices: &[PricePoint], values: &mut [IndicatorValue]) {
    for i in 0..prices.len() {
        if i < PERIOD - 1 {
            continue;
        }
        let mid = values[i].ma20;
        let sigma = std_deviation(&prices[i + 1 - PERIOD..=i], mid);
        values[i].boll_mid = mid;
        values[i].boll_up = round2(mid + sigma * BAND_WIDTH);
        values[i].boll_down = round2(mid - sigma * BAND_WIDTH);
    }
}

/// Population standard deviation of the window's closes around `mean`.
fn std_deviation(window: &[PricePoint], mean: f64) -> f64 {
    let sum: f64 = window
        .iter()
        .map(|p| (p.close - mean) * (p.close - mean))
        .sum();
    (sum / window.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::indicators::ma;
    use crate::engine::testutil::flat_bars;

    fn compute_for(closes: &[f64]) -> Vec<IndicatorValue> {
        let prices = flat_bars(closes);
        let mut values = vec![IndicatorValue::default(); prices.len()];
        ma::compute(&prices, &mut values);
        compute(&prices, &mut values);
        values
    }

    #[test]
    fn sentinel_before_warmup() {
        let closes: Vec<f64> = (1..=30).map(|v| v as f64).collect();
        let values = compute_for(&closes);
        for v in &values[..19] {
            assert_eq!(v.boll_mid, 0.0);
            assert_eq!(v.boll_up, 0.0);
            assert_eq!(v.boll_down, 0.0);
        }
        assert!(values[19].boll_up > values[19].boll_mid);
        assert!(values[19].boll_down < values[19].boll_mid);
    }

    #[test]
    fn flat_series_collapses_bands() {
        let values = compute_for(&[50.0; 25]);
        let v = &values[24];
        assert_eq!(v.boll_mid, 50.0);
        assert_eq!(v.boll_up, 50.0);
        assert_eq!(v.boll_down, 50.0);
    }

    #[test]
    fn bands_are_symmetric_around_mid() {
        let closes: Vec<f64> = (0..40).map(|i| 20.0 + ((i * 3) % 11) as f64).collect();
        let values = compute_for(&closes);
        for v in &values[19..] {
            let up = v.boll_up - v.boll_mid;
            let down = v.boll_mid - v.boll_down;
            assert!((up - down).abs() <= 0.011, "bands asymmetric: {up} vs {down}");
        }
    }
}
