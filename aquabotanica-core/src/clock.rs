use core::fmt::Write;

const SECONDS_PER_DAY: i64 = 86_400;

/// Wall-clock time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockTime {
    /// Derive the local time of day from a Unix epoch.
    ///
    /// # Arguments
    /// * `epoch_secs` - Seconds since 1970-01-01T00:00:00Z.
    /// * `offset_secs` - Timezone offset added before splitting.
    pub fn from_epoch(epoch_secs: i64, offset_secs: i64) -> Self {
        let of_day = (epoch_secs + offset_secs).rem_euclid(SECONDS_PER_DAY);

        Self {
            hour: (of_day / 3_600) as u8,
            minute: (of_day % 3_600 / 60) as u8,
            second: (of_day % 60) as u8,
        }
    }

    /// Format as `HH:MM:SS`.
    pub fn hms(&self) -> heapless::String<16> {
        let mut out = heapless::String::new();
        // Eight characters always fit.
        let _ = write!(out, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TIMEZONE_OFFSET_SECS;

    #[test]
    fn splits_epoch_with_offset() {
        // 2024-03-10T13:45:07Z
        let t = ClockTime::from_epoch(1_710_078_307, TIMEZONE_OFFSET_SECS);
        assert_eq!(
            t,
            ClockTime {
                hour: 14,
                minute: 45,
                second: 7
            }
        );
    }

    #[test]
    fn offset_wraps_past_midnight() {
        let t = ClockTime::from_epoch(23 * 3_600 + 30 * 60, TIMEZONE_OFFSET_SECS);
        assert_eq!(t.hms().as_str(), "00:30:00");
    }

    #[test]
    fn pre_epoch_values_stay_in_range() {
        let t = ClockTime::from_epoch(-1, 0);
        assert_eq!(t.hms().as_str(), "23:59:59");
    }

    #[test]
    fn zero_padded() {
        let t = ClockTime {
            hour: 7,
            minute: 3,
            second: 9,
        };
        assert_eq!(t.hms().as_str(), "07:03:09");
    }
}
