// =============================================================================
// Session Rotation — vendor cookie pool with expiry
// =============================================================================
//
// Some vendors rate-limit per session cookie. The pool hands out one cookie at
// a time; a caller that hits a failure advances to the next cookie, and the
// remembered position expires after an hour so a temporarily banned cookie
// gets retried eventually.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// How long a remembered cookie position stays valid.
const ROTATION_TTL: Duration = Duration::from_secs(60 * 60);

struct Slot {
    index: usize,
    refreshed_at: Instant,
}

/// Thread-safe rotating cursor over a fixed cookie list.
pub struct SessionRotation {
    cookies: Vec<String>,
    slot: Mutex<Slot>,
}

impl SessionRotation {
    /// An empty `cookies` list degrades to a single anonymous session.
    pub fn new(mut cookies: Vec<String>) -> Self {
        if cookies.is_empty() {
            cookies.push(String::new());
        }
        Self {
            cookies,
            slot: Mutex::new(Slot {
                index: 0,
                refreshed_at: Instant::now(),
            }),
        }
    }

    /// Never zero: the constructor backfills an anonymous session.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// The current cookie and its index. After the TTL the cursor resets to
    /// the first cookie.
    pub fn current(&self) -> (usize, &str) {
        let mut slot = self.slot.lock();
        if slot.refreshed_at.elapsed() > ROTATION_TTL {
            slot.index = 0;
            slot.refreshed_at = Instant::now();
        }
        (slot.index, &self.cookies[slot.index])
    }

    /// Advance past a failed cookie. `failed_index` guards against two
    /// concurrent callers both advancing for the same failure.
    pub fn advance(&self, failed_index: usize) {
        let mut slot = self.slot.lock();
        if slot.index == failed_index {
            slot.index = (failed_index + 1) % self.cookies.len();
            slot.refreshed_at = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_degrades_to_anonymous() {
        let pool = SessionRotation::new(Vec::new());
        assert_eq!(pool.len(), 1);
        assert!(!pool.is_empty());
        let (idx, cookie) = pool.current();
        assert_eq!(idx, 0);
        assert!(cookie.is_empty());
    }

    #[test]
    fn advance_wraps_around() {
        let pool = SessionRotation::new(vec!["a".into(), "b".into()]);
        assert_eq!(pool.current().0, 0);
        pool.advance(0);
        assert_eq!(pool.current().1, "b");
        pool.advance(1);
        assert_eq!(pool.current().1, "a");
    }

    #[test]
    fn stale_failure_does_not_double_advance() {
        let pool = SessionRotation::new(vec!["a".into(), "b".into(), "c".into()]);
        pool.advance(0);
        // A second caller reporting the already-rotated index is a no-op.
        pool.advance(0);
        assert_eq!(pool.current().1, "b");
    }
}
