// =============================================================================
// Momentum Divergence — candidate buy/sell points around a pivot zone
// =============================================================================
//
// Given the fractal list and the MACD series, pick one dominant pivot zone and
// trend direction, then test directional-leg pairs for weakening momentum: a
// new price extreme whose MACD same-sign histogram area and peak dif are both
// weaker than the leg that entered the zone marks a 1st-degree point. The next
// opposite-class fractal after a 1st-degree point is emitted unconditionally
// as the 2nd-degree point.
//
// With exactly one zone the trend context is ambiguous: both directions are
// tested independently and the results unioned, which can emit a Buy and a
// Sell from the same data. That is intentional, not a reconciliation bug.

use serde::Serialize;

use crate::engine::fractal::{Fractal, FractalClass};
use crate::engine::pivot::PivotZone;
use crate::engine::runs::Direction;
use crate::engine::{IndicatorValue, PricePoint};

/// Peak-dif slack: a candidate whose |dif| is within this margin of the
/// entering leg's still counts as weaker.
const DIF_TOLERANCE: f64 = 0.04;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DivergenceKind {
    Buy1,
    Buy2,
    /// Defined for completeness; detection is not implemented.
    Buy3,
    Sell1,
    Sell2,
    /// Defined for completeness; detection is not implemented.
    Sell3,
}

impl std::fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            DivergenceKind::Buy1 => "B1",
            DivergenceKind::Buy2 => "B2",
            DivergenceKind::Buy3 => "B3",
            DivergenceKind::Sell1 => "S1",
            DivergenceKind::Sell2 => "S2",
            DivergenceKind::Sell3 => "S3",
        };
        write!(f, "{tag}")
    }
}

/// A typed signal point anchored to one bar index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DivergencePoint {
    pub index: usize,
    pub kind: DivergenceKind,
}

/// Analyze the fractal list against the pivot zones and emit divergence
/// points. Zero zones yield zero points; a missing entering leg yields no
/// signal for that direction — neither is an error.
pub fn divergence_points(
    prices: &[PricePoint],
    indicators: &[IndicatorValue],
    fractals: &[Fractal],
    pivots: &[PivotZone],
) -> Vec<DivergencePoint> {
    if pivots.is_empty() {
        return Vec::new();
    }

    if pivots.len() > 1 {
        // Zone sequence establishes the trend context: a strictly lower
        // second zone means a descending structure anchored at the globally
        // lowest-low zone; otherwise ascending, anchored at the highest-low.
        let (anchor, direction) = if pivots[1].low < pivots[0].low {
            let mut anchor = &pivots[0];
            for zone in pivots {
                if zone.low < anchor.low {
                    anchor = zone;
                }
            }
            (anchor, Direction::Down)
        } else {
            let mut anchor = &pivots[0];
            for zone in pivots {
                if zone.low > anchor.low {
                    anchor = zone;
                }
            }
            (anchor, Direction::Up)
        };
        return points_for_zone(prices, indicators, anchor, fractals, direction);
    }

    // Single zone: direction is ambiguous, run both tests and union.
    let anchor = &pivots[0];
    let mut points = points_for_zone(prices, indicators, anchor, fractals, Direction::Up);
    points.extend(points_for_zone(
        prices,
        indicators,
        anchor,
        fractals,
        Direction::Down,
    ));
    points
}

fn points_for_zone(
    prices: &[PricePoint],
    indicators: &[IndicatorValue],
    zone: &PivotZone,
    fractals: &[Fractal],
    direction: Direction,
) -> Vec<DivergencePoint> {
    let mut points = Vec::new();
    if let Some(first) = first_degree(prices, indicators, zone, fractals, direction) {
        if let Some(second) = second_degree(fractals, direction, &first) {
            points.push(first);
            points.push(second);
        } else {
            points.push(first);
        }
    }
    points
}

/// 1st-degree test: compare the leg entering the zone against the single most
/// price-extreme later leg of the extreme-forming class.
fn first_degree(
    prices: &[PricePoint],
    indicators: &[IndicatorValue],
    zone: &PivotZone,
    fractals: &[Fractal],
    direction: Direction,
) -> Option<DivergencePoint> {
    let wanted = match direction {
        Direction::Up => FractalClass::Bottom,
        Direction::Down => FractalClass::Top,
    };

    let candidates: Vec<&Fractal> = fractals
        .iter()
        .filter(|f| f.start >= zone.start && f.class == wanted)
        .collect();

    let extreme = extreme_leg(prices, &candidates, direction)?;
    let entering = leg_at_boundary(fractals, zone.start)?;

    match direction {
        Direction::Up => {
            // Needs a genuinely higher high than the entering leg reached.
            if prices[extreme.end].high <= prices[entering.end].high {
                return None;
            }
            let (enter_area, enter_dif) = macd_strength(indicators, entering, direction);
            let (ext_area, ext_dif) = macd_strength(indicators, extreme, direction);
            if ext_area < enter_area && (ext_dif < enter_dif || ext_dif - enter_dif < DIF_TOLERANCE)
            {
                return Some(DivergencePoint {
                    index: extreme.end,
                    kind: DivergenceKind::Sell1,
                });
            }
        }
        Direction::Down => {
            if prices[extreme.end].low >= prices[entering.end].low {
                return None;
            }
            let (enter_area, enter_dif) = macd_strength(indicators, entering, direction);
            let (ext_area, ext_dif) = macd_strength(indicators, extreme, direction);
            // Areas are negative sums here: closer to zero means weaker.
            if ext_area > enter_area && (ext_dif > enter_dif || enter_dif - ext_dif < DIF_TOLERANCE)
            {
                return Some(DivergencePoint {
                    index: extreme.end,
                    kind: DivergenceKind::Buy1,
                });
            }
        }
    }

    None
}

/// 2nd-degree: the first opposite-class fractal after the 1st-degree point,
/// emitted with no additional momentum test.
fn second_degree(
    fractals: &[Fractal],
    direction: Direction,
    first: &DivergencePoint,
) -> Option<DivergencePoint> {
    let mut past_first = false;
    for f in fractals {
        if f.end == first.index {
            past_first = true;
            continue;
        }
        if !past_first {
            continue;
        }
        match direction {
            Direction::Up => {
                if f.class == FractalClass::Bottom {
                    return Some(DivergencePoint {
                        index: f.end,
                        kind: DivergenceKind::Sell2,
                    });
                }
            }
            Direction::Down => {
                if f.class == FractalClass::Top {
                    return Some(DivergencePoint {
                        index: f.end,
                        kind: DivergenceKind::Buy2,
                    });
                }
            }
        }
    }
    None
}

/// Direct extremum pick over the candidate legs: lowest ending low for a Down
/// context, highest ending low for Up. First occurrence wins ties.
fn extreme_leg<'a>(
    prices: &[PricePoint],
    candidates: &[&'a Fractal],
    direction: Direction,
) -> Option<&'a Fractal> {
    let mut best = *candidates.first()?;
    for f in candidates {
        let better = match direction {
            Direction::Down => prices[f.end].low < prices[best.end].low,
            Direction::Up => prices[f.end].low > prices[best.end].low,
        };
        if better {
            best = f;
        }
    }
    Some(best)
}

/// The leg whose end sits on the zone's entry boundary; falls back to a leg
/// starting there.
fn leg_at_boundary(fractals: &[Fractal], boundary: usize) -> Option<&Fractal> {
    fractals
        .iter()
        .find(|f| f.end == boundary)
        .or_else(|| fractals.iter().find(|f| f.start == boundary))
}

/// MACD "strength" of one leg: the sum of same-sign histogram values over its
/// span plus the peak dif among those bars (minimum dif for Down, maximum for
/// Up, both seeded at 0).
fn macd_strength(
    indicators: &[IndicatorValue],
    leg: &Fractal,
    direction: Direction,
) -> (f64, f64) {
    let mut area = 0.0;
    let mut peak = 0.0f64;
    for value in &indicators[leg.start..=leg.end] {
        let histogram = value.macd_histogram();
        match direction {
            Direction::Down => {
                if histogram < 0.0 {
                    area += histogram;
                    peak = peak.min(value.macd_dif);
                }
            }
            Direction::Up => {
                if histogram > 0.0 {
                    area += histogram;
                    peak = peak.max(value.macd_dif);
                }
            }
        }
    }
    (area, peak)
}
