use crate::error::Error;
use crate::hardware::Relay;
use log::debug;

/// Moisture band for one watering mode.
///
/// Readings at or below `low` need water now, readings up to and including
/// `high` need water soon, anything above `high` is fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoistureThreshold {
    /// Upper bound (inclusive) of the "water now" band.
    pub low: i32,

    /// Upper bound (inclusive) of the "water soon" band.
    pub high: i32,
}

/// Watering status shown on the live panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WateringStatus {
    /// Water now, relay on.
    Giessen,

    /// Water soon, relay off.
    BaldGiessen,

    /// Fine, relay off.
    AllesGut,
}

impl WateringStatus {
    /// Label drawn on the status line.
    pub fn label(self) -> &'static str {
        match self {
            WateringStatus::Giessen => "Giessen",
            WateringStatus::BaldGiessen => "Bald Giessen",
            WateringStatus::AllesGut => "Alles Gut",
        }
    }

    /// Relay level for this status.
    pub fn relay_on(self) -> bool {
        matches!(self, WateringStatus::Giessen)
    }
}

/// Face drawn on the standby sunflower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Happy,
    Neutral,
    Sad,
}

impl MoistureThreshold {
    /// Classify a raw moisture reading. First match wins.
    ///
    /// # Arguments
    /// * `moisture` - Raw sensor reading.
    ///
    /// # Returns
    /// * `WateringStatus` - The band the reading falls into.
    pub fn classify(&self, moisture: i32) -> WateringStatus {
        if moisture <= self.low {
            WateringStatus::Giessen
        } else if moisture <= self.high {
            WateringStatus::BaldGiessen
        } else {
            WateringStatus::AllesGut
        }
    }

    /// Mood for the standby graphic.
    pub fn mood(&self, moisture: i32) -> Mood {
        match self.classify(moisture) {
            WateringStatus::AllesGut => Mood::Happy,
            WateringStatus::BaldGiessen => Mood::Neutral,
            WateringStatus::Giessen => Mood::Sad,
        }
    }
}

/// Classify `moisture` and drive the relay accordingly.
///
/// The pin is written on every call, whether or not the level changed.
///
/// # Arguments
/// * `relay` - The relay output.
/// * `threshold` - The band of the active mode.
/// * `moisture` - Raw sensor reading.
///
/// # Returns
/// * `Result<WateringStatus, Error>` - The classification, or the relay error.
pub fn water<R: Relay>(
    relay: &mut R,
    threshold: &MoistureThreshold,
    moisture: i32,
) -> Result<WateringStatus, Error> {
    let status = threshold.classify(moisture);
    debug!(
        "Moisture {} in band {}..{}: {}",
        moisture,
        threshold.low,
        threshold.high,
        status.label()
    );
    relay.set(status.relay_on())?;

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingRelay {
        writes: Vec<bool>,
    }

    impl Relay for RecordingRelay {
        fn set(&mut self, on: bool) -> Result<(), Error> {
            self.writes.push(on);
            Ok(())
        }
    }

    struct BrokenRelay;

    impl Relay for BrokenRelay {
        fn set(&mut self, _on: bool) -> Result<(), Error> {
            Err(Error::Relay("pin not configured".into()))
        }
    }

    const MODE_ONE: MoistureThreshold = MoistureThreshold { low: 10, high: 200 };

    #[test]
    fn band_edges() {
        for band in crate::config::THRESHOLDS {
            assert_eq!(band.classify(band.low), WateringStatus::Giessen);
            assert_eq!(band.classify(band.low + 1), WateringStatus::BaldGiessen);
            assert_eq!(band.classify(band.high), WateringStatus::BaldGiessen);
            assert_eq!(band.classify(band.high + 1), WateringStatus::AllesGut);
        }
    }

    #[test]
    fn out_of_range_readings_still_classify() {
        assert_eq!(MODE_ONE.classify(-1), WateringStatus::Giessen);
        assert_eq!(MODE_ONE.classify(i32::MIN), WateringStatus::Giessen);
        assert_eq!(MODE_ONE.classify(i32::MAX), WateringStatus::AllesGut);
    }

    #[test]
    fn relay_follows_classification() {
        let mut relay = RecordingRelay::default();

        assert_eq!(water(&mut relay, &MODE_ONE, 5).unwrap(), WateringStatus::Giessen);
        assert_eq!(
            water(&mut relay, &MODE_ONE, 150).unwrap(),
            WateringStatus::BaldGiessen
        );
        assert_eq!(water(&mut relay, &MODE_ONE, 500).unwrap(), WateringStatus::AllesGut);

        assert_eq!(relay.writes, vec![true, false, false]);
    }

    #[test]
    fn relay_is_rewritten_when_unchanged() {
        let mut relay = RecordingRelay::default();
        water(&mut relay, &MODE_ONE, 5).unwrap();
        water(&mut relay, &MODE_ONE, 6).unwrap();
        assert_eq!(relay.writes, vec![true, true]);
    }

    #[test]
    fn relay_error_propagates() {
        assert_eq!(
            water(&mut BrokenRelay, &MODE_ONE, 5),
            Err(Error::Relay("pin not configured".into()))
        );
    }

    #[test]
    fn mood_matches_bands() {
        assert_eq!(MODE_ONE.mood(10), Mood::Sad);
        assert_eq!(MODE_ONE.mood(11), Mood::Neutral);
        assert_eq!(MODE_ONE.mood(200), Mood::Neutral);
        assert_eq!(MODE_ONE.mood(201), Mood::Happy);
    }

    #[test]
    fn labels() {
        assert_eq!(WateringStatus::Giessen.label(), "Giessen");
        assert_eq!(WateringStatus::BaldGiessen.label(), "Bald Giessen");
        assert_eq!(WateringStatus::AllesGut.label(), "Alles Gut");
    }
}
