//! Time abstraction for cycle timing and timed routines.
//!
//! The cycle driver stamps every cycle with [`TimeSource::now_us`] to detect
//! overruns, and routines read the same timestamp through their context.

use alloc::rc::Rc;
use core::cell::Cell;

/// Monotonic microsecond clock.
///
/// Implementations:
/// - `MockTime` for host testing with controllable time
/// - `WallClock` (in the sim crate) backed by `std::time::Instant`
///
/// # Example
///
/// ```
/// use robocycle_core::traits::{MockTime, TimeSource};
///
/// fn cycle_due<T: TimeSource>(time: &T, last_cycle_us: u64, period_us: u64) -> bool {
///     time.elapsed_since(last_cycle_us) >= period_us
/// }
///
/// let time = MockTime::new();
/// time.advance(20_000);
/// assert!(cycle_due(&time, 0, 20_000));
/// ```
pub trait TimeSource {
    /// Current time in microseconds since an arbitrary epoch.
    fn now_us(&self) -> u64;

    /// Current time in milliseconds.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    /// Microseconds elapsed since `reference_us`, saturating at zero.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

/// Controllable clock shared between the driver and the test body.
///
/// Clones observe the same time, so a test can hand one clone to the
/// [`Robot`](crate::scheduler::Robot) and advance another.
///
/// ```
/// use robocycle_core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// let driver_view = time.clone();
/// time.advance(1_500);
/// assert_eq!(driver_view.now_us(), 1_500);
/// assert_eq!(driver_view.now_ms(), 1);
/// ```
#[derive(Clone, Default, Debug)]
pub struct MockTime {
    current_us: Rc<Cell<u64>>,
}

impl MockTime {
    /// Starts at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts at `us`.
    pub fn with_initial(us: u64) -> Self {
        let time = Self::new();
        time.set(us);
        time
    }

    /// Set an absolute time.
    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    /// Advance by `us`, saturating.
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get().saturating_add(us));
    }
}

impl TimeSource for MockTime {
    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}
