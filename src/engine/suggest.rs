// =============================================================================
// Indicator Suggestions — heuristic buy/sell/hold readings
// =============================================================================
//
// Last-mile interpretation of the computed indicator series: moving-average
// trend state, Bollinger band position, MACD turn detection and KDJ crosses.
// Each analyzer returns an operation, a priority and a human-readable reason;
// none of them can fail — insufficient history reads as "no operation".

use serde::Serialize;

use crate::engine::{IndicatorValue, PricePoint};

/// Trailing window sizes, matching what each heuristic actually looks at.
pub const MA_WINDOW: usize = 20;
pub const MACD_WINDOW: usize = 50;
pub const KDJ_WINDOW: usize = 10;

const KDJ_OVERSOLD: f64 = 20.0;
const KDJ_OVERBOUGHT: f64 = 80.0;
/// Fraction of a band gap above which a price counts as "close to" the upper
/// bound.
const BOLLINGER_CLOSENESS: f64 = 0.33;
/// Slack under which a dip in a trailing series still counts as descending.
const TREND_SLACK: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestOperation {
    None,
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// One analyzer's verdict over the trailing window it inspected.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub operation: SuggestOperation,
    pub priority: Priority,
    pub reason: String,
}

impl Suggestion {
    fn none(reason: impl Into<String>) -> Self {
        Self {
            operation: SuggestOperation::None,
            priority: Priority::Low,
            reason: reason.into(),
        }
    }
}

/// All four analyzer verdicts over one series.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionSet {
    pub ma: Suggestion,
    pub bolling: Suggestion,
    pub macd: Suggestion,
    pub kdj: Suggestion,
}

/// Run every analyzer over the trailing windows of the series.
pub fn suggest_all(prices: &[PricePoint], indicators: &[IndicatorValue]) -> SuggestionSet {
    SuggestionSet {
        ma: suggest_ma(tail(indicators, MA_WINDOW)),
        bolling: suggest_bolling(tail(prices, MA_WINDOW), tail(indicators, MA_WINDOW)),
        macd: suggest_macd(tail(indicators, MACD_WINDOW)),
        kdj: suggest_kdj(tail(indicators, KDJ_WINDOW)),
    }
}

fn tail<T>(items: &[T], window: usize) -> &[T] {
    &items[items.len().saturating_sub(window)..]
}

// ---------------------------------------------------------------------------
// Moving averages
// ---------------------------------------------------------------------------

/// MA trend reading: both the 5- and 10-bar averages still descending means a
/// confirmed down trend (sell); a 5-bar average that turned up and crossed
/// above the 10-bar one reads as a reversal (buy).
pub fn suggest_ma(indicators: &[IndicatorValue]) -> Suggestion {
    let Some(last) = indicators.last() else {
        return Suggestion::none("no indicator data");
    };

    let ma5: Vec<f64> = indicators.iter().map(|v| v.ma5).collect();
    let ma10: Vec<f64> = indicators.iter().map(|v| v.ma10).collect();
    let n = indicators.len();

    let ma5_falling = trailing_min_index(&ma5) == Some(n - 1);
    let ma10_falling = trailing_min_index(&ma10) == Some(n - 1);

    if ma5_falling && ma10_falling {
        return Suggestion {
            operation: SuggestOperation::Sell,
            priority: Priority::High,
            reason: format!(
                "ma5 and ma10 are both descending, confirmed down trend ({})",
                ma_order(last)
            ),
        };
    }

    if ma5_falling {
        // The 5-bar average has not turned yet; nothing to act on.
        return Suggestion::none("ma5 still descending, waiting for a turn");
    }

    if last.ma5 > last.ma10 {
        let mut suggestion = Suggestion {
            operation: SuggestOperation::Buy,
            priority: Priority::High,
            reason: "ma5 turned up and crossed above ma10, reversal signal".to_string(),
        };
        if ma10_falling {
            suggestion.reason.push_str("; ma10 still descending");
        }
        suggestion
    } else {
        Suggestion::none("ma5 turned up but remains below ma10, watch only")
    }
}

/// Ascending order of the five averages on the last bar, e.g.
/// "ma60 < ma30 < ma20 < ma10 < ma5".
fn ma_order(last: &IndicatorValue) -> String {
    let mut pairs = [
        ("ma5", last.ma5),
        ("ma10", last.ma10),
        ("ma20", last.ma20),
        ("ma30", last.ma30),
        ("ma60", last.ma60),
    ];
    pairs.sort_by(|a, b| a.1.total_cmp(&b.1));
    pairs
        .iter()
        .map(|(label, _)| *label)
        .collect::<Vec<_>>()
        .join(" < ")
}

// ---------------------------------------------------------------------------
// Bollinger position
// ---------------------------------------------------------------------------

/// Band-position reading of the last close: near the upper band hold, near
/// the middle the recent close trend decides buy vs sell, near the lower band
/// sell.
pub fn suggest_bolling(prices: &[PricePoint], indicators: &[IndicatorValue]) -> Suggestion {
    let (Some(bar), Some(value)) = (prices.last(), indicators.last()) else {
        return Suggestion::none("no price data");
    };
    if value.boll_up == 0.0 && value.boll_down == 0.0 {
        return Suggestion::none("bollinger bands not warmed up yet");
    }

    if close_to_high(bar.close, value.boll_up, value.boll_mid, BOLLINGER_CLOSENESS) {
        return Suggestion {
            operation: SuggestOperation::Hold,
            priority: Priority::High,
            reason: "price near the upper band, hold".to_string(),
        };
    }

    if close_to_high(
        bar.close,
        value.boll_mid,
        value.boll_down,
        1.0 - BOLLINGER_CLOSENESS,
    ) {
        // Near the middle band: which side was it crossed from?
        let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();
        if trailing_min_index(&closes) == Some(closes.len() - 1) {
            return Suggestion {
                operation: SuggestOperation::Sell,
                priority: Priority::Low,
                reason: "price crossed the middle band from above, sell or stand aside"
                    .to_string(),
            };
        }
        return Suggestion {
            operation: SuggestOperation::Buy,
            priority: Priority::Low,
            reason: "price crossed the middle band from below, buy or stand aside".to_string(),
        };
    }

    Suggestion {
        operation: SuggestOperation::Sell,
        priority: Priority::High,
        reason: "price near the lower band, sell".to_string(),
    }
}

fn close_to_high(value: f64, high: f64, low: f64, fraction: f64) -> bool {
    if value >= high {
        true
    } else if value <= low {
        false
    } else {
        value >= (high - low) * fraction + low
    }
}

// ---------------------------------------------------------------------------
// MACD turn detection
// ---------------------------------------------------------------------------

/// MACD buy-point reading over the trailing window: find where the signal
/// line stopped falling, walk forward to where dif overtakes it, and grade
/// the turn by its age and the dif level relative to the zero axis.
pub fn suggest_macd(indicators: &[IndicatorValue]) -> Suggestion {
    let n = indicators.len();
    let dea: Vec<f64> = indicators.iter().map(|v| v.macd_dea).collect();
    let Some(mut turn) = trailing_min_index(&dea) else {
        return Suggestion::none("not enough data for a macd reading");
    };

    // Advance to the first bar where dif has caught up with the signal line.
    let mut idx = turn;
    while idx < n && indicators[idx].macd_dif < indicators[idx].macd_dea {
        idx += 1;
    }
    if idx < n {
        turn = idx;
    }

    let last = &indicators[n - 1];

    if turn == n - 1 {
        // The signal line is still falling; only a fresh histogram flip is
        // worth a note.
        if last.macd_dif > last.macd_dea {
            return Suggestion {
                operation: SuggestOperation::Buy,
                priority: Priority::Low,
                reason: "macd histogram just flipped red, watch for an entry".to_string(),
            };
        }
        return Suggestion::none("macd still pointing down, no buy point");
    }

    if turn >= n.saturating_sub(3) {
        // Fresh turn: flag it as soon as the histogram confirms.
        for i in (turn..n).rev() {
            if indicators[i].macd_dif > indicators[i].macd_dea {
                return Suggestion {
                    operation: SuggestOperation::Buy,
                    priority: Priority::Low,
                    reason: "macd histogram just flipped red, watch for an entry".to_string(),
                };
            }
        }
    }

    let (reason, priority) = if last.macd_dif < 0.0 {
        if last.macd_dif < -0.2 {
            (
                "macd turned up below zero, good buy point but still far from the axis",
                Priority::High,
            )
        } else {
            (
                "macd turned up below zero, good buy point and about to cross the axis",
                Priority::High,
            )
        }
    } else if last.macd_dif < 0.2 {
        (
            "macd above zero and freshly across the axis, good buy point",
            Priority::Low,
        )
    } else {
        (
            "macd well above zero, buy point worth considering",
            Priority::Low,
        )
    };

    Suggestion {
        operation: SuggestOperation::Buy,
        priority,
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// KDJ crosses
// ---------------------------------------------------------------------------

/// KDJ cross reading of the last two bars: a golden cross in oversold
/// territory buys, a dead cross in overbought territory sells.
pub fn suggest_kdj(indicators: &[IndicatorValue]) -> Suggestion {
    if indicators.len() < 2 {
        return Suggestion::none("not enough data for a kdj reading");
    }
    let prev = &indicators[indicators.len() - 2];
    let cur = &indicators[indicators.len() - 1];

    if prev.kdj_k < prev.kdj_d && cur.kdj_k > cur.kdj_d {
        if cur.kdj_k < KDJ_OVERSOLD || cur.kdj_d < KDJ_OVERSOLD {
            return Suggestion {
                operation: SuggestOperation::Buy,
                priority: Priority::Low,
                reason: "kdj golden cross in oversold territory, buy".to_string(),
            };
        }
    }

    if prev.kdj_k > prev.kdj_d && cur.kdj_k < cur.kdj_d {
        if cur.kdj_k > KDJ_OVERBOUGHT || cur.kdj_d > KDJ_OVERBOUGHT {
            return Suggestion {
                operation: SuggestOperation::Sell,
                priority: Priority::Low,
                reason: "kdj dead cross in overbought territory, sell".to_string(),
            };
        }
    }

    Suggestion::none("no kdj cross on the last bar")
}

// ---------------------------------------------------------------------------
// Trailing-minimum search
// ---------------------------------------------------------------------------

/// Walk back from the end while values keep descending (with `TREND_SLACK`
/// tolerance), then return the index of the minimum inside that stretch.
/// `None` only for an empty slice.
fn trailing_min_index(values: &[f64]) -> Option<usize> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let end = n - 1;
    let mut start = end;

    for i in (0..end).rev() {
        if values[i] <= values[i + 1] || values[i] - values[i + 1] <= TREND_SLACK {
            start = i;
        } else {
            break;
        }
    }

    let mut min_idx = start;
    for i in start + 1..=end {
        if values[i] < values[min_idx] {
            min_idx = i;
        }
    }
    Some(min_idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compute_indicators;
    use crate::engine::testutil::flat_bars;

    #[test]
    fn trailing_min_finds_the_bottom_of_a_descent() {
        assert_eq!(trailing_min_index(&[5.0, 4.0, 3.0, 2.0]), Some(3));
        // Descent then recovery: the minimum sits inside the stretch.
        assert_eq!(trailing_min_index(&[5.0, 4.0, 2.0, 3.0]), Some(2));
        assert_eq!(trailing_min_index(&[]), None);
        assert_eq!(trailing_min_index(&[1.0]), Some(0));
    }

    #[test]
    fn trailing_min_tolerates_slack() {
        // The +0.005 uptick is within slack and does not break the stretch.
        assert_eq!(trailing_min_index(&[5.0, 4.0, 4.005, 3.0]), Some(3));
    }

    #[test]
    fn descending_series_suggests_sell() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 - i as f64).collect();
        let prices = flat_bars(&closes);
        let indicators = compute_indicators(&prices);
        let suggestion = suggest_ma(&indicators[indicators.len() - MA_WINDOW..]);
        assert_eq!(suggestion.operation, SuggestOperation::Sell);
        assert_eq!(suggestion.priority, Priority::High);
    }

    #[test]
    fn kdj_without_cross_is_silent() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let prices = flat_bars(&closes);
        let indicators = compute_indicators(&prices);
        let suggestion = suggest_kdj(&indicators[indicators.len() - KDJ_WINDOW..]);
        // A steady rise keeps K above D with no fresh cross.
        assert_eq!(suggestion.operation, SuggestOperation::None);
    }

    #[test]
    fn kdj_golden_cross_in_oversold_buys() {
        let mut indicators = vec![IndicatorValue::default(); 2];
        indicators[0].kdj_k = 12.0;
        indicators[0].kdj_d = 15.0;
        indicators[1].kdj_k = 18.0;
        indicators[1].kdj_d = 16.0;
        let suggestion = suggest_kdj(&indicators);
        assert_eq!(suggestion.operation, SuggestOperation::Buy);
    }

    #[test]
    fn bolling_without_warmup_is_silent() {
        let prices = flat_bars(&[10.0; 5]);
        let indicators = vec![IndicatorValue::default(); 5];
        let suggestion = suggest_bolling(&prices, &indicators);
        assert_eq!(suggestion.operation, SuggestOperation::None);
    }

    #[test]
    fn ma_order_sorts_ascending() {
        let value = IndicatorValue {
            ma5: 12.0,
            ma10: 11.0,
            ma20: 10.0,
            ma30: 9.0,
            ma60: 8.0,
            ..Default::default()
        };
        assert_eq!(ma_order(&value), "ma60 < ma30 < ma20 < ma10 < ma5");
    }

    #[test]
    fn suggest_all_runs_on_short_history() {
        let prices = flat_bars(&[10.0, 10.5, 11.0]);
        let indicators = compute_indicators(&prices);
        let set = suggest_all(&prices, &indicators);
        // Nothing is warmed up; every analyzer stays quiet instead of failing.
        assert_eq!(set.bolling.operation, SuggestOperation::None);
    }
}
