// =============================================================================
// Directional Runs — raw price-path segmentation
// =============================================================================
//
// A run is a maximal contiguous index range whose successive low prices move
// in one direction. The first bar classifies itself by open→close; every later
// bar compares its low against the previous bar's low. A flat comparison
// extends the current direction when one is established, otherwise nothing
// starts.
//
// Adjacent runs share a boundary bar: each stored run begins on the bar the
// previous run ended on, so later merges only move indices, never copy bars.

use serde::Serialize;

use crate::engine::PricePoint;

/// Run orientation. Also reused as the trend context for divergence analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Up,
    Down,
}

/// A maximal single-direction index range over the shared bar array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectionalRun {
    pub start: usize,
    pub end: usize,
    pub direction: Direction,
}

impl DirectionalRun {
    fn new(start: usize, end: usize, direction: Direction) -> Self {
        // Share the starting bar with the preceding run's end.
        let start = if start > 0 { start - 1 } else { 0 };
        Self {
            start,
            end,
            direction,
        }
    }

    /// Number of bars the run moves across (shared boundary excluded).
    pub fn span(&self) -> usize {
        self.end - self.start
    }
}

/// Split the bar sequence into alternating directional runs.
///
/// Fewer than two bars cannot establish a comparison and yield no runs.
pub fn directional_runs(prices: &[PricePoint]) -> Vec<DirectionalRun> {
    let n = prices.len();
    if n < 2 {
        return Vec::new();
    }

    let mut runs = Vec::new();
    let mut start = 0usize;
    let mut current: Option<Direction> = None;

    for i in 0..n {
        if i == 0 {
            let diff = prices[0].close - prices[0].open;
            if diff > 0.0 {
                current = Some(Direction::Up);
            } else if diff < 0.0 {
                current = Some(Direction::Down);
            }
            continue;
        }

        let diff = prices[i].low - prices[i - 1].low;
        let step = if diff > 0.0 {
            Some(Direction::Up)
        } else if diff < 0.0 {
            Some(Direction::Down)
        } else {
            current
        };

        if let Some(direction) = step {
            match current {
                None => {
                    current = Some(direction);
                    start = i;
                }
                Some(active) if active != direction => {
                    runs.push(DirectionalRun::new(start, i - 1, active));
                    current = Some(direction);
                    start = i;
                }
                _ => {}
            }
        }
        // Flat with no established direction: neither terminates nor starts.
    }

    if let Some(active) = current {
        runs.push(DirectionalRun::new(start, n - 1, active));
    }

    runs
}

/// Collapse noise-length runs in one left-to-right sweep.
///
/// A 3-run window (prev, cur, next) merges when `cur` spans at most 2 bars and
/// the absorbing side holds the losing extreme: for an Up `cur`, prev's ending
/// low above next's ending low; for a Down `cur`, prev's ending high below
/// next's ending high. On a merge, `cur` and `next` are deleted and prev is
/// extended to next's end — and the sweep continues forward; opportunities
/// created by an earlier merge are deliberately not revisited.
pub fn collapse_noise(prices: &[PricePoint], runs: Vec<DirectionalRun>) -> Vec<DirectionalRun> {
    let mut slots: Vec<Option<DirectionalRun>> = runs.into_iter().map(Some).collect();
    let n = slots.len();
    let mut pre: Option<usize> = None;

    for i in 0..n.saturating_sub(1) {
        if slots[i].is_none() {
            continue;
        }
        let Some(p) = pre else {
            pre = Some(i);
            continue;
        };

        let (cur_span, cur_direction) = match &slots[i] {
            Some(run) => (run.span(), run.direction),
            None => continue,
        };
        let Some(next_end) = slots[i + 1].as_ref().map(|run| run.end) else {
            continue;
        };
        let Some(pre_end) = slots[p].as_ref().map(|run| run.end) else {
            continue;
        };

        let absorbed = cur_span <= 2
            && match cur_direction {
                Direction::Up => prices[pre_end].low > prices[next_end].low,
                Direction::Down => prices[pre_end].high < prices[next_end].high,
            };

        if absorbed {
            if let Some(pre_run) = slots[p].as_mut() {
                pre_run.end = next_end;
            }
            slots[i] = None;
            slots[i + 1] = None;
            // prev keeps its slot and may absorb again further along.
        } else {
            pre = Some(i);
        }
    }

    slots.into_iter().flatten().collect()
}
