// =============================================================================
// Pivot Zones — consolidation bands from overlapping fractals
// =============================================================================
//
// Three consecutive fractals whose implied price intervals share a common band
// open a pivot zone: high = min of the three highs, low = max of the three
// lows. The zone then greedily absorbs every following fractal whose interval
// still overlaps the band (extending the zone's end), and the scan resumes
// after the absorbed range. Without overlap the window advances one fractal.

use serde::Serialize;

use crate::engine::fractal::{Fractal, FractalClass};
use crate::engine::PricePoint;

/// A consolidation price band over the shared bar array. `low <= high` always.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotZone {
    pub start: usize,
    pub end: usize,
    pub low: f64,
    pub high: f64,
}

/// The price interval a fractal occupies, by orientation: a Top (falling leg)
/// spans [end-low, start-high]; a Bottom (rising leg) [start-low, end-high].
pub fn fractal_interval(prices: &[PricePoint], fractal: &Fractal) -> (f64, f64) {
    match fractal.class {
        FractalClass::Top => (prices[fractal.end].low, prices[fractal.start].high),
        FractalClass::Bottom => (prices[fractal.start].low, prices[fractal.end].high),
    }
}

/// Form zero or more disjoint, index-ordered pivot zones.
pub fn pivot_zones(prices: &[PricePoint], fractals: &[Fractal]) -> Vec<PivotZone> {
    let mut zones = Vec::new();
    let n = fractals.len();
    let mut i = 0;

    while i + 2 < n {
        let (l1, h1) = fractal_interval(prices, &fractals[i]);
        let (l2, h2) = fractal_interval(prices, &fractals[i + 1]);
        let (l3, h3) = fractal_interval(prices, &fractals[i + 2]);

        let band_high = h1.min(h2).min(h3);
        let band_low = l1.max(l2).max(l3);

        if band_low <= band_high {
            let mut zone = PivotZone {
                start: fractals[i].start,
                end: fractals[i + 2].start,
                low: band_low,
                high: band_high,
            };

            // Absorb every following fractal that still overlaps the band.
            let mut j = i + 3;
            while j < n {
                let (low_j, high_j) = fractal_interval(prices, &fractals[j]);
                if low_j <= zone.high && high_j >= zone.low {
                    zone.end = fractals[j].start;
                    j += 1;
                } else {
                    break;
                }
            }

            zones.push(zone);
            i = j;
        } else {
            i += 1;
        }
    }

    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fractal::classify;
    use crate::engine::runs::{collapse_noise, directional_runs};
    use crate::engine::testutil::flat_bars;

    fn zones_for(closes: &[f64]) -> (Vec<PivotZone>, Vec<Fractal>, Vec<crate::engine::PricePoint>) {
        let prices = flat_bars(closes);
        let runs = collapse_noise(&prices, directional_runs(&prices));
        let fractals = classify(&prices, &runs);
        let zones = pivot_zones(&prices, &fractals);
        (zones, fractals, prices)
    }

    /// An oscillating band: repeated 5-bar swings between 20 and 25.
    fn oscillating_closes(swings: usize) -> Vec<f64> {
        let mut closes = vec![30.0, 28.0, 26.0, 24.0, 22.0, 20.0];
        for _ in 0..swings {
            closes.extend([21.0, 22.0, 23.0, 24.0, 25.0]);
            closes.extend([24.0, 23.0, 22.0, 21.0, 20.0]);
        }
        closes
    }

    #[test]
    fn trend_without_overlap_forms_no_zone() {
        let closes: Vec<f64> = (1..=40).map(|v| v as f64).collect();
        let (zones, _, _) = zones_for(&closes);
        assert!(zones.is_empty());
    }

    #[test]
    fn oscillation_forms_one_zone() {
        let (zones, fractals, _) = zones_for(&oscillating_closes(4));
        assert!(fractals.len() >= 3);
        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert!(zone.low <= zone.high);
        assert!(zone.start < zone.end);
    }

    #[test]
    fn absorbed_fractals_overlap_the_band() {
        let (zones, fractals, prices) = zones_for(&oscillating_closes(5));
        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        for f in fractals
            .iter()
            .filter(|f| f.start >= zone.start && f.start <= zone.end)
        {
            let (low, high) = fractal_interval(prices.as_slice(), f);
            assert!(
                low <= zone.high && high >= zone.low,
                "fractal [{}, {}] does not overlap band [{}, {}]",
                low,
                high,
                zone.low,
                zone.high
            );
        }
    }

    #[test]
    fn interval_orientation_follows_class() {
        let (_, fractals, prices) = zones_for(&oscillating_closes(3));
        for f in &fractals {
            let (low, high) = fractal_interval(&prices, f);
            assert!(low <= high, "inverted interval for {f:?}");
        }
    }

    #[test]
    fn fewer_than_three_fractals_yield_nothing() {
        let mut closes: Vec<f64> = (0..20).map(|i| 60.0 - 2.0 * i as f64).collect();
        closes.extend((1..=20).map(|i| 22.0 + 2.0 * i as f64));
        let (zones, fractals, _) = zones_for(&closes);
        assert_eq!(fractals.len(), 2);
        assert!(zones.is_empty());
    }
}
