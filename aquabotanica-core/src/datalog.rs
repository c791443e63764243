//! Append-only CSV log of sensor readings.

use crate::clock::ClockTime;
use crate::error::Error;
use crate::hardware::SensorSample;
use log::{error, info};

/// First line of a fresh log.
pub const HEADER: &str = "Zeit,Feuchtigkeit_Pflanze,Temperatur,Luftfeuchtigkeit";

/// Sequential record store.
pub trait LogStore {
    /// Whether the store already exists.
    fn exists(&self) -> bool;

    /// Open, append `line` plus a line terminator, and close.
    fn append_line(&mut self, line: &str) -> Result<(), Error>;
}

/// Format one log row: `HH:MM:SS,moisture,temperature,humidity`.
///
/// # Arguments
/// * `time` - Wall-clock time of the reading.
/// * `sample` - The reading.
///
/// # Returns
/// * `String` - The row without a line terminator.
pub fn format_row(time: ClockTime, sample: &SensorSample) -> String {
    format!(
        "{},{},{:.2},{:.2}",
        time.hms(),
        sample.moisture,
        sample.temperature,
        sample.humidity
    )
}

/// Writes validated samples to a [`LogStore`].
pub struct DataLogger<S> {
    store: S,
}

impl<S: LogStore> DataLogger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write the header row unless the store already exists.
    ///
    /// # Returns
    /// * `Result<bool, Error>` - Whether a header was written.
    pub fn ensure_header(&mut self) -> Result<bool, Error> {
        if self.store.exists() {
            info!("CSV log already exists, no header written");
            return Ok(false);
        }

        self.store.append_line(HEADER)?;
        info!("CSV header written");

        Ok(true)
    }

    /// Append a row for `sample` if temperature and humidity are valid.
    ///
    /// An invalid sample is reported and skipped; an unwritable store is
    /// reported. Neither is retried.
    ///
    /// # Returns
    /// * `bool` - Whether a row was written.
    pub fn record(&mut self, time: ClockTime, sample: &SensorSample) -> bool {
        if !sample.is_valid() {
            error!("Sensor read failed, skipping log row");
            return false;
        }

        match self.store.append_line(&format_row(time, sample)) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to append CSV row: {e}");
                false
            }
        }
    }
}
