//! Cycle timing types
//!
//! - [`CycleBudget`]: target period, overrun tolerance and execution budget
//! - [`CycleStats`]: runtime measurements of the cycle driver

/// Default cycle period (50 Hz)
pub const DEFAULT_PERIOD_US: u32 = 20_000;

/// Default overrun tolerance in percent of the period
pub const DEFAULT_OVERRUN_TOLERANCE_PERCENT: u32 = 5;

/// Timing contract of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBudget {
    /// Target time between cycle starts in microseconds
    pub period_us: u32,

    /// How far past `period_us` a cycle may start before it counts as an
    /// overrun, in percent
    pub overrun_tolerance_percent: u32,

    /// Execution time budget in microseconds
    ///
    /// A cycle whose own work takes longer than this is counted as a budget
    /// miss. Leave headroom below `period_us` for the platform.
    pub budget_us: u32,
}

impl Default for CycleBudget {
    fn default() -> Self {
        Self {
            period_us: DEFAULT_PERIOD_US,
            overrun_tolerance_percent: DEFAULT_OVERRUN_TOLERANCE_PERCENT,
            budget_us: DEFAULT_PERIOD_US / 4 * 3,
        }
    }
}

impl CycleBudget {
    /// Budget for a given rate in Hz
    pub fn from_rate_hz(rate_hz: u32) -> Self {
        let period_us = 1_000_000 / rate_hz.max(1);
        Self {
            period_us,
            budget_us: period_us / 4 * 3,
            ..Self::default()
        }
    }

    /// Longest acceptable gap between cycle starts
    #[inline]
    pub const fn overrun_threshold_us(&self) -> u64 {
        let period = self.period_us as u64;
        period + period * self.overrun_tolerance_percent as u64 / 100
    }

    /// Check whether a measured gap between cycle starts is an overrun
    #[inline]
    pub const fn is_overrun(&self, period_us: u64) -> bool {
        period_us > self.overrun_threshold_us()
    }

    #[inline]
    pub const fn is_within_budget(&self, execution_us: u32) -> bool {
        execution_us <= self.budget_us
    }
}

/// Runtime statistics of the cycle driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Last execution time in microseconds
    pub last_execution_us: u32,

    /// Average execution time in microseconds (EMA, alpha = 0.1)
    pub avg_execution_us: u32,

    /// Maximum execution time observed in microseconds
    pub max_execution_us: u32,

    /// Cycles whose execution exceeded the budget
    pub budget_misses: u32,

    /// Cycles that started later than the overrun threshold
    pub overruns: u32,

    /// Last measured gap between cycle starts in microseconds
    pub last_period_us: u32,

    /// Average deviation from the target period in microseconds (EMA)
    pub avg_jitter_us: u32,

    /// Total number of cycles
    pub cycle_count: u64,
}

impl CycleStats {
    /// Record one cycle
    ///
    /// `period_us` is `None` for the first cycle after a reset, which has no
    /// previous start to measure against.
    pub fn record(&mut self, execution_us: u32, period_us: Option<u32>, budget: &CycleBudget) {
        self.last_execution_us = execution_us;
        self.cycle_count = self.cycle_count.saturating_add(1);

        // avg_new = (value + 9 * avg_old) / 10
        self.avg_execution_us = if self.avg_execution_us == 0 {
            execution_us
        } else {
            ema(execution_us, self.avg_execution_us)
        };

        self.max_execution_us = self.max_execution_us.max(execution_us);

        if !budget.is_within_budget(execution_us) {
            self.budget_misses = self.budget_misses.saturating_add(1);
        }

        if let Some(period_us) = period_us {
            self.last_period_us = period_us;
            let jitter = period_us.abs_diff(budget.period_us);
            self.avg_jitter_us = if self.avg_jitter_us == 0 {
                jitter
            } else {
                ema(jitter, self.avg_jitter_us)
            };
        }
    }

    pub fn record_overrun(&mut self) {
        self.overruns = self.overruns.saturating_add(1);
    }

    /// Reset all statistics to initial state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[inline]
fn ema(value: u32, avg: u32) -> u32 {
    ((value as u64 + 9 * avg as u64) / 10) as u32
}

/// Saturating microsecond conversion for the u32 statistic fields
#[inline]
pub(crate) fn saturate_us(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrun_threshold_five_percent() {
        let budget = CycleBudget::default();

        assert_eq!(budget.overrun_threshold_us(), 21_000);
        assert!(!budget.is_overrun(20_000));
        assert!(!budget.is_overrun(21_000));
        assert!(budget.is_overrun(21_001));
    }

    #[test]
    fn test_from_rate() {
        let budget = CycleBudget::from_rate_hz(100);
        assert_eq!(budget.period_us, 10_000);
        assert_eq!(budget.budget_us, 7_500);
        assert_eq!(budget.overrun_threshold_us(), 10_500);
    }

    #[test]
    fn test_stats_record() {
        let budget = CycleBudget::default();
        let mut stats = CycleStats::default();

        stats.record(1_500, None, &budget);
        assert_eq!(stats.avg_execution_us, 1_500);
        assert_eq!(stats.last_period_us, 0);
        assert_eq!(stats.cycle_count, 1);

        stats.record(1_600, Some(20_000), &budget);
        assert_eq!(stats.avg_execution_us, (1_600 + 9 * 1_500) / 10);
        assert_eq!(stats.max_execution_us, 1_600);
        assert_eq!(stats.avg_jitter_us, 0);

        stats.record(16_000, Some(20_400), &budget);
        assert_eq!(stats.budget_misses, 1);
        assert_eq!(stats.avg_jitter_us, 400);
        assert_eq!(stats.max_execution_us, 16_000);
    }

    #[test]
    fn test_saturate_us() {
        assert_eq!(saturate_us(12), 12);
        assert_eq!(saturate_us(u64::MAX), u32::MAX);
    }
}
