// =============================================================================
// Moving Averages — MA5 / MA10 / MA20 / MA30 / MA60
// =============================================================================
//
// Running window sums over the close series. Nothing is published before the
// 20-bar baseline exists (index 19); MA30 and MA60 additionally wait for their
// own windows (indices 29 and 59). Short averages warm up earlier internally
// but stay at the sentinel until the baseline so the whole family reads as one
// consistent block.

use crate::engine::{round2, IndicatorValue, PricePoint};

const PERIODS: [usize; 5] = [5, 10, 20, 30, 60];

/// Index from which the MA family is published at all.
pub const BASELINE_WARMUP: usize = 19;

pub fn compute(prices: &[PricePoint], values: &mut [IndicatorValue]) {
    let mut sums = [0.0f64; 5];

    for i in 0..prices.len() {
        let close = prices[i].close;
        for (slot, &period) in PERIODS.iter().enumerate() {
            sums[slot] += close;
            if i >= period {
                sums[slot] -= prices[i - period].close;
            }
        }

        if i >= BASELINE_WARMUP {
            values[i].ma5 = round2(sums[0] / 5.0);
            values[i].ma10 = round2(sums[1] / 10.0);
            values[i].ma20 = round2(sums[2] / 20.0);
            if i >= 29 {
                values[i].ma30 = round2(sums[3] / 30.0);
            }
            if i >= 59 {
                values[i].ma60 = round2(sums[4] / 60.0);
            }
        }
    }
}
