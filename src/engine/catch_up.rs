//! Catch-up after the host was suspended past one or more timer ends.
//!
//! Given the durations of a set, the index that was counting down and how
//! far past its end the clock now is, [`walk`] determines where the run
//! should be and which timers were completed in the meantime.

/// Result of walking forward through missed timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchUp {
    /// Index the run lands on. Meaningless when `finished`.
    pub index: usize,
    /// Remaining milliseconds of the timer at `index`.
    pub remaining_ms: u64,
    /// Number of timers completed during the gap (the overdue one included).
    pub completed: u32,
    /// Sum of the completed timers' durations in seconds.
    pub completed_sec: u64,
    /// Whether the whole set ran out during the gap.
    pub finished: bool,
}

/// Walks forward from `current`, which ended `overdue_ms` ago.
///
/// The current timer is always credited. Each following timer is credited
/// while the leftover overdue time covers its full duration; zero-length
/// timers are passed through and credited.
#[must_use]
pub fn walk(durations: &[u64], current: usize, overdue_ms: u64) -> CatchUp {
    let mut completed = 0u32;
    let mut completed_sec = 0u64;

    let Some(&first) = durations.get(current) else {
        return CatchUp {
            index: current,
            remaining_ms: 0,
            completed,
            completed_sec,
            finished: true,
        };
    };
    completed += 1;
    completed_sec = completed_sec.saturating_add(first);

    let mut left = overdue_ms;
    for (index, &duration_sec) in durations.iter().enumerate().skip(current + 1) {
        let duration_ms = duration_sec.saturating_mul(1000);
        if left < duration_ms {
            return CatchUp {
                index,
                remaining_ms: duration_ms - left,
                completed,
                completed_sec,
                finished: false,
            };
        }
        left -= duration_ms;
        completed += 1;
        completed_sec = completed_sec.saturating_add(duration_sec);
    }

    CatchUp {
        index: durations.len().saturating_sub(1),
        remaining_ms: 0,
        completed,
        completed_sec,
        finished: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lands_inside_next_timer() {
        let result = walk(&[60, 60, 60], 0, 30_000);
        assert_eq!(
            result,
            CatchUp {
                index: 1,
                remaining_ms: 30_000,
                completed: 1,
                completed_sec: 60,
                finished: false,
            }
        );
    }

    #[test]
    fn test_skips_whole_timers() {
        // Ended 90s ago: timer 1 (60s) fully missed, 30s into timer 2.
        let result = walk(&[60, 60, 60], 0, 90_000);
        assert_eq!(result.index, 2);
        assert_eq!(result.remaining_ms, 30_000);
        assert_eq!(result.completed, 2);
        assert_eq!(result.completed_sec, 120);
        assert!(!result.finished);
    }

    #[test]
    fn test_exact_boundary_completes_timer() {
        let result = walk(&[10, 20, 30], 0, 20_000);
        assert_eq!(result.index, 2);
        assert_eq!(result.remaining_ms, 30_000);
        assert_eq!(result.completed, 2);
    }

    #[test]
    fn test_finishes_run() {
        let result = walk(&[10, 20, 30], 1, 31_000);
        assert!(result.finished);
        assert_eq!(result.completed, 2);
        assert_eq!(result.completed_sec, 50);
    }

    #[test]
    fn test_last_timer_overdue() {
        let result = walk(&[10, 20], 1, 5);
        assert!(result.finished);
        assert_eq!(result.completed, 1);
        assert_eq!(result.completed_sec, 20);
    }

    #[test]
    fn test_zero_durations_are_credited() {
        let result = walk(&[10, 0, 0, 40], 0, 1_000);
        assert_eq!(result.index, 3);
        assert_eq!(result.remaining_ms, 39_000);
        assert_eq!(result.completed, 3);
        assert_eq!(result.completed_sec, 10);
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(walk(&[10], 3, 0).finished);
    }
}
