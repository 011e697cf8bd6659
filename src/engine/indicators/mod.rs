// =============================================================================
// Indicator Engine
// =============================================================================
//
// Leaf layer of the analysis pipeline: pure array-to-array transforms with no
// branching state. Each module fills its own fields of the shared
// `IndicatorValue` array in one pass over the bars. Published values are
// rounded to two decimals; fields stay at the sentinel 0 until the indicator's
// warm-up window has elapsed.

pub mod bollinger;
pub mod kdj;
pub mod ma;
pub mod macd;
