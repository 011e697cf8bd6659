// =============================================================================
// Series Store — in-memory chronological bar series per instrument
// =============================================================================
//
// One sorted bar vector per (code, granularity) pair. Upserts merge by bar
// date: a refetched bar replaces the stored one (vendors restate the current
// session's bar until the session closes), new bars are inserted in order.
// Readers get clones; the engine never sees a series mid-mutation.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::engine::PricePoint;
use crate::types::KlineType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    code: String,
    kline: KlineType,
}

#[derive(Default)]
pub struct SeriesStore {
    series: RwLock<HashMap<SeriesKey, Vec<PricePoint>>>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `bars` into the stored series for `code`. Returns how many bars
    /// were newly inserted (replacements not counted).
    pub fn upsert(&self, code: &str, kline: KlineType, bars: &[PricePoint]) -> usize {
        let key = SeriesKey {
            code: code.to_string(),
            kline,
        };
        let mut series = self.series.write();
        let stored = series.entry(key).or_default();

        let mut inserted = 0;
        for bar in bars {
            match stored.binary_search_by_key(&bar.date, |b| b.date) {
                Ok(pos) => stored[pos] = bar.clone(),
                Err(pos) => {
                    stored.insert(pos, bar.clone());
                    inserted += 1;
                }
            }
        }
        inserted
    }

    /// The full stored series for `code`, oldest first.
    pub fn get(&self, code: &str, kline: KlineType) -> Option<Vec<PricePoint>> {
        let key = SeriesKey {
            code: code.to_string(),
            kline,
        };
        self.series.read().get(&key).cloned()
    }

    /// The trailing `limit` bars for `code`.
    pub fn tail(&self, code: &str, kline: KlineType, limit: usize) -> Option<Vec<PricePoint>> {
        self.get(code, kline)
            .map(|bars| bars[bars.len().saturating_sub(limit)..].to_vec())
    }

    pub fn len(&self, code: &str, kline: KlineType) -> usize {
        let key = SeriesKey {
            code: code.to_string(),
            kline,
        };
        self.series.read().get(&key).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }

    /// Every code with at least one stored series.
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .series
            .read()
            .keys()
            .map(|k| k.code.clone())
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }
}
