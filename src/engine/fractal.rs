// =============================================================================
// Fractal Classification — alternating structural turning points
// =============================================================================
//
// Runs become fractals of alternating class. A Top fractal is a falling leg
// (starts at a high, ends at a low); a Bottom fractal is a rising leg. The
// first run seeds a fractal of the sense opposite to its direction. A run
// shorter than `MIN_CLASS_LEN` bars that is not the final run fails to flip
// the class: it and the following run are absorbed into the open fractal.
//
// After classification, interior fractal boundaries are re-snapped to the true
// local extreme of their span; the snap moves both the fractal's own start and
// the preceding fractal's end to the same bar, so adjacent fractals always
// share exactly one anchor.

use serde::Serialize;

use crate::engine::runs::{Direction, DirectionalRun};
use crate::engine::PricePoint;

/// Minimum run span (in bars) for a run to close the open fractal and flip
/// the class.
pub const MIN_CLASS_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FractalClass {
    Top,
    Bottom,
}

impl FractalClass {
    fn flip(self) -> Self {
        match self {
            FractalClass::Top => FractalClass::Bottom,
            FractalClass::Bottom => FractalClass::Top,
        }
    }
}

/// A classified turning-point leg over the shared bar array. Adjacent fractals
/// share one boundary bar (`end` of one equals `start` of the next).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fractal {
    pub start: usize,
    pub end: usize,
    pub class: FractalClass,
}

/// Classify collapsed runs into alternating Top/Bottom fractals and snap the
/// interior anchors to their true extremes.
///
/// Fewer than two runs produce zero or one fractal; never an error.
pub fn classify(prices: &[PricePoint], runs: &[DirectionalRun]) -> Vec<Fractal> {
    let mut fractals: Vec<Fractal> = Vec::new();
    let n = runs.len();
    let mut i = 0;

    while i < n {
        let run = &runs[i];
        match fractals.last_mut() {
            None => {
                // An initial descent ends at a low of the opposite sense, so
                // it opens a Top fractal; an initial rise opens a Bottom.
                let class = match run.direction {
                    Direction::Down => FractalClass::Top,
                    Direction::Up => FractalClass::Bottom,
                };
                fractals.push(Fractal {
                    start: run.start,
                    end: run.end,
                    class,
                });
                i += 1;
            }
            Some(open) => {
                if run.span() < MIN_CLASS_LEN && i < n - 1 {
                    // Too short to flip: absorb this run and the next one.
                    open.end = runs[i + 1].end;
                    i += 2;
                } else {
                    let class = open.class.flip();
                    fractals.push(Fractal {
                        start: run.start,
                        end: run.end,
                        class,
                    });
                    i += 1;
                }
            }
        }
    }

    snap_anchors(prices, &mut fractals);
    fractals
}

/// Move each interior fractal's start (and the preceding fractal's end) to the
/// extreme bar of its span: minimum low for a Bottom, maximum high for a Top.
/// The final fractal is still forming and is left untouched.
fn snap_anchors(prices: &[PricePoint], fractals: &mut [Fractal]) {
    let n = fractals.len();
    for i in 1..n.saturating_sub(1) {
        let (start, end, class) = {
            let f = &fractals[i];
            (f.start, f.end, f.class)
        };

        let mut anchor = start;
        for idx in start..end {
            match class {
                FractalClass::Bottom => {
                    if prices[idx].low < prices[anchor].low {
                        anchor = idx;
                    }
                }
                FractalClass::Top => {
                    if prices[idx].high > prices[anchor].high {
                        anchor = idx;
                    }
                }
            }
        }

        fractals[i - 1].end = anchor;
        fractals[i].start = anchor;
    }
}
