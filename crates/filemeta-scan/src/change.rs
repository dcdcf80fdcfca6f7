//! Change detection against a high-water mark.

use filemeta_core::FileTimes;

/// Decide whether an entry passes the change filter and fold its
/// timestamps into the running high-water mark.
///
/// The mark always advances, whether or not the entry passes. Access time
/// counts toward the mark but never makes an entry pass.
pub fn evaluate(times: &FileTimes, running: i64, must_be_later_than: Option<i64>) -> (bool, i64) {
    let updated = running.max(times.latest());
    let passes = match must_be_later_than {
        None => true,
        Some(threshold) => times.latest_change() > threshold,
    };
    (passes, updated)
}

/// Running change state for one scan.
#[derive(Debug, Clone, Copy)]
pub struct ChangeTracker {
    must_be_later_than: Option<i64>,
    high_water_mark: i64,
}

impl ChangeTracker {
    /// Start from the previous high-water mark.
    ///
    /// `must_be_later_than` stays fixed for the whole scan; `None` lets
    /// every entry through.
    pub fn new(previous: i64, must_be_later_than: Option<i64>) -> Self {
        Self {
            must_be_later_than,
            high_water_mark: previous,
        }
    }

    /// Evaluate one entry and advance the mark.
    pub fn evaluate(&mut self, times: &FileTimes) -> bool {
        let (passes, updated) = evaluate(times, self.high_water_mark, self.must_be_later_than);
        self.high_water_mark = updated;
        passes
    }

    /// Latest timestamp observed so far.
    pub fn high_water_mark(&self) -> i64 {
        self.high_water_mark
    }

    /// The fixed threshold, if filtering.
    pub fn must_be_later_than(&self) -> Option<i64> {
        self.must_be_later_than
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_passes_everything() {
        let (passes, mark) = evaluate(&FileTimes::new(1, 2, 3), 10, None);
        assert!(passes);
        assert_eq!(mark, 10);
    }

    #[test]
    fn test_modification_passes() {
        let (passes, mark) = evaluate(&FileTimes::new(100, 150, 90), 100, Some(100));
        assert!(passes);
        assert_eq!(mark, 150);
    }

    #[test]
    fn test_change_time_passes() {
        let (passes, _) = evaluate(&FileTimes::new(50, 50, 101), 100, Some(100));
        assert!(passes);
    }

    #[test]
    fn test_equal_timestamp_does_not_pass() {
        let (passes, _) = evaluate(&FileTimes::new(100, 100, 100), 100, Some(100));
        assert!(!passes);
    }

    #[test]
    fn test_access_only_moves_mark_but_not_filter() {
        let mut tracker = ChangeTracker::new(100, Some(100));
        assert!(!tracker.evaluate(&FileTimes::new(500, 90, 90)));
        assert_eq!(tracker.high_water_mark(), 500);
    }

    #[test]
    fn test_threshold_is_fixed_while_mark_advances() {
        let mut tracker = ChangeTracker::new(100, Some(100));
        assert!(tracker.evaluate(&FileTimes::new(0, 300, 0)));
        assert_eq!(tracker.high_water_mark(), 300);

        // Still compared against 100, not 300.
        assert!(tracker.evaluate(&FileTimes::new(0, 200, 0)));
        assert_eq!(tracker.high_water_mark(), 300);
        assert_eq!(tracker.must_be_later_than(), Some(100));
    }

    #[test]
    fn test_mark_never_decreases() {
        let mut tracker = ChangeTracker::new(1_000, None);
        tracker.evaluate(&FileTimes::new(1, 2, 3));
        assert_eq!(tracker.high_water_mark(), 1_000);
    }
}
