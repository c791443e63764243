/// A fixed-period action driven by the millisecond tick count.
///
/// Each task keeps its own last-fired timestamp; tasks never synchronize
/// with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTask {
    /// Period in milliseconds.
    period_ms: u64,

    /// Tick count when the task last fired.
    last_fire_ms: u64,
}

impl PeriodicTask {
    /// Create a task that first becomes due one period after boot.
    ///
    /// # Arguments
    /// * `period_ms` - The period in milliseconds.
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_fire_ms: 0,
        }
    }

    /// Tick count when the task last fired.
    pub fn last_fire_ms(&self) -> u64 {
        self.last_fire_ms
    }

    /// Whether a full period has elapsed since the last fire.
    ///
    /// A tick count behind the last fire counts as no time elapsed.
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_fire_ms) >= self.period_ms
    }

    /// Fire the task if it is due.
    ///
    /// # Arguments
    /// * `now_ms` - Current tick count.
    ///
    /// # Returns
    /// * `bool` - `true` if the task fired and its action should run.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if self.is_due(now_ms) {
            self.last_fire_ms = now_ms;
            true
        } else {
            false
        }
    }
}
