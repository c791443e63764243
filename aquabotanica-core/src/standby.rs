//! Live/standby display state and per-field redraw tracking.

use crate::config::{WAKE_DISTANCE_MM, WAKE_MIC_LEVEL};
use crate::hardware::SensorSample;

/// What the screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// Numeric sensor panel, entered at `since_ms`.
    Live { since_ms: u64 },

    /// Idle mood graphic.
    Standby,
}

/// Transition requested by [`StandbyMachine::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to redraw.
    Stay,

    /// Draw the live panel from scratch.
    EnterLive,

    /// Clear the screen and draw the mood graphic.
    EnterStandby,
}

/// Proximity or sound requests the live panel.
///
/// # Arguments
/// * `distance_mm` - Proximity sensor range.
/// * `mic_level` - Raw microphone amplitude.
pub fn wake_condition(distance_mm: u16, mic_level: i32) -> bool {
    distance_mm <= WAKE_DISTANCE_MM || mic_level > WAKE_MIC_LEVEL
}

/// Decides between the live panel and the standby graphic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandbyMachine {
    panel: Panel,
    timeout_ms: u64,
}

impl StandbyMachine {
    /// Create a machine that is live from boot.
    ///
    /// # Arguments
    /// * `timeout_ms` - Time in live without a wake signal before standby.
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            panel: Panel::Live { since_ms: 0 },
            timeout_ms,
        }
    }

    /// Current panel.
    pub fn panel(&self) -> Panel {
        self.panel
    }

    /// Whether the live panel is showing.
    pub fn is_live(&self) -> bool {
        matches!(self.panel, Panel::Live { .. })
    }

    /// Tick count when live was last entered, if live.
    pub fn live_since(&self) -> Option<u64> {
        match self.panel {
            Panel::Live { since_ms } => Some(since_ms),
            Panel::Standby => None,
        }
    }

    /// Enter live unconditionally, restarting the timeout.
    pub fn enter_live(&mut self, now_ms: u64) {
        self.panel = Panel::Live { since_ms: now_ms };
    }

    /// Evaluate the wake condition for this tick.
    ///
    /// A wake signal while already live is ignored: it neither restarts the
    /// timeout nor requests a redraw. Standby only follows once the signal is
    /// gone and the timeout has elapsed since live was entered.
    ///
    /// # Arguments
    /// * `now_ms` - Current tick count.
    /// * `wake` - Result of [`wake_condition`].
    ///
    /// # Returns
    /// * `Transition` - The redraw the caller must perform.
    pub fn evaluate(&mut self, now_ms: u64, wake: bool) -> Transition {
        match (self.panel, wake) {
            (Panel::Standby, true) => {
                self.enter_live(now_ms);
                Transition::EnterLive
            }
            (Panel::Live { since_ms }, false)
                if now_ms.saturating_sub(since_ms) >= self.timeout_ms =>
            {
                self.panel = Panel::Standby;
                Transition::EnterStandby
            }
            _ => Transition::Stay,
        }
    }
}

/// Last values drawn on the live panel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldTracker {
    moisture: Option<i32>,
    temperature: Option<f32>,
    humidity: Option<f32>,
}

/// Fields that differ from what is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Changes {
    pub moisture: bool,
    pub temperature: bool,
    pub humidity: bool,
}

impl FieldTracker {
    /// Forget everything drawn so the next update redraws every field.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// Whether nothing has been drawn since the last invalidation.
    pub fn is_clear(&self) -> bool {
        self.moisture.is_none() && self.temperature.is_none() && self.humidity.is_none()
    }

    /// Record a new moisture value.
    pub fn moisture(&mut self, value: i32) -> bool {
        Self::track(&mut self.moisture, value)
    }

    /// Record a valid sample and report which fields need redrawing.
    pub fn update(&mut self, sample: &SensorSample) -> Changes {
        Changes {
            moisture: Self::track(&mut self.moisture, sample.moisture),
            temperature: Self::track(&mut self.temperature, sample.temperature),
            humidity: Self::track(&mut self.humidity, sample.humidity),
        }
    }

    fn track<T: PartialEq + Copy>(slot: &mut Option<T>, value: T) -> bool {
        if *slot == Some(value) {
            false
        } else {
            *slot = Some(value);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DISPLAY_TIMEOUT_MS;

    fn sample(moisture: i32, temperature: f32, humidity: f32) -> SensorSample {
        SensorSample {
            moisture,
            temperature,
            humidity,
        }
    }

    #[test]
    fn wake_thresholds() {
        assert!(wake_condition(100, 0));
        assert!(!wake_condition(101, 650));
        assert!(wake_condition(101, 651));
        assert!(wake_condition(0, 1023));
        assert!(!wake_condition(u16::MAX, 0));
    }

    #[test]
    fn live_times_out_to_standby() {
        let mut machine = StandbyMachine::new(DISPLAY_TIMEOUT_MS);
        machine.enter_live(0);

        assert_eq!(machine.evaluate(19_999, false), Transition::Stay);
        assert_eq!(machine.evaluate(20_001, false), Transition::EnterStandby);
        assert_eq!(machine.panel(), Panel::Standby);
        assert_eq!(machine.evaluate(20_002, false), Transition::Stay);
    }

    #[test]
    fn wake_from_standby_records_entry_time() {
        let mut machine = StandbyMachine::new(DISPLAY_TIMEOUT_MS);
        machine.evaluate(25_000, false);
        assert!(!machine.is_live());

        assert_eq!(machine.evaluate(30_000, true), Transition::EnterLive);
        assert_eq!(machine.live_since(), Some(30_000));
    }

    #[test]
    fn repeated_wake_while_live_keeps_entry_time() {
        let mut machine = StandbyMachine::new(DISPLAY_TIMEOUT_MS);
        machine.enter_live(1_000);

        for now in (1_001..60_000).step_by(250) {
            assert_eq!(machine.evaluate(now, true), Transition::Stay);
        }
        assert_eq!(machine.live_since(), Some(1_000));

        // Signal drops long after the timeout: standby follows at once.
        assert_eq!(machine.evaluate(60_000, false), Transition::EnterStandby);
    }

    #[test]
    fn forced_live_restarts_timeout() {
        let mut machine = StandbyMachine::new(DISPLAY_TIMEOUT_MS);
        machine.evaluate(20_000, false);
        machine.enter_live(50_000);

        assert_eq!(machine.evaluate(69_999, false), Transition::Stay);
        assert_eq!(machine.evaluate(70_000, false), Transition::EnterStandby);
    }

    #[test]
    fn backward_step_keeps_live() {
        let mut machine = StandbyMachine::new(DISPLAY_TIMEOUT_MS);
        machine.enter_live(1_700_000_000_500);

        assert_eq!(machine.evaluate(1_700_000_000_400, false), Transition::Stay);
        assert_eq!(machine.evaluate(1_700_000_020_499, false), Transition::Stay);
        assert_eq!(machine.evaluate(1_700_000_020_500, false), Transition::EnterStandby);
    }

    #[test]
    fn tracker_reports_only_changed_fields() {
        let mut tracker = FieldTracker::default();
        assert!(tracker.is_clear());

        let all = tracker.update(&sample(120, 21.5, 40.0));
        assert_eq!(
            all,
            Changes {
                moisture: true,
                temperature: true,
                humidity: true
            }
        );

        let some = tracker.update(&sample(120, 22.0, 40.0));
        assert_eq!(
            some,
            Changes {
                moisture: false,
                temperature: true,
                humidity: false
            }
        );

        assert_eq!(tracker.update(&sample(120, 22.0, 40.0)), Changes::default());
    }

    #[test]
    fn invalidate_forces_full_redraw() {
        let mut tracker = FieldTracker::default();
        tracker.update(&sample(120, 21.5, 40.0));
        tracker.invalidate();

        assert!(tracker.is_clear());
        assert!(tracker.update(&sample(120, 21.5, 40.0)).humidity);
    }

    #[test]
    fn moisture_alone() {
        let mut tracker = FieldTracker::default();
        assert!(tracker.moisture(300));
        assert!(!tracker.moisture(300));
        assert!(tracker.moisture(301));
    }
}
