//! Narrow interfaces to the device's sensors and outputs.

use crate::clock::ClockTime;
use crate::error::Error;
use crate::irrigation::{Mood, WateringStatus};
use crate::mode::{ModeButton, PlantMode};
use enumset::EnumSet;

/// Temperature/humidity pair. Either may be NaN after a failed read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    /// Degrees Celsius.
    pub temperature: f32,

    /// Relative humidity in percent.
    pub humidity: f32,
}

/// One fresh reading of the plant sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Raw moisture reading. There is no failure value.
    pub moisture: i32,

    /// Degrees Celsius, NaN on failure.
    pub temperature: f32,

    /// Relative humidity in percent, NaN on failure.
    pub humidity: f32,
}

impl SensorSample {
    pub fn new(moisture: i32, climate: Climate) -> Self {
        Self {
            moisture,
            temperature: climate.temperature,
            humidity: climate.humidity,
        }
    }

    /// Both temperature and humidity were read successfully.
    pub fn is_valid(&self) -> bool {
        !self.temperature.is_nan() && !self.humidity.is_nan()
    }
}

/// Synchronous sensor reads.
pub trait Sensors {
    /// Raw soil moisture.
    fn moisture(&mut self) -> i32;

    /// Ambient temperature and humidity.
    fn climate(&mut self) -> Climate;

    /// Proximity range in millimetres.
    fn distance_mm(&mut self) -> u16;

    /// Raw microphone amplitude.
    fn microphone(&mut self) -> i32;

    /// Mode buttons currently held down.
    fn pressed_buttons(&mut self) -> EnumSet<ModeButton>;

    /// Sample moisture, temperature and humidity together.
    fn sample(&mut self) -> SensorSample {
        let moisture = self.moisture();
        SensorSample::new(moisture, self.climate())
    }
}

/// Watering relay.
pub trait Relay {
    fn set(&mut self, on: bool) -> Result<(), Error>;
}

/// Colour hint for free-form notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Failure,
}

/// Everything the controller draws.
pub trait Screen {
    /// Backlight brightness, 0..=100.
    fn set_backlight(&mut self, percent: u8) -> Result<(), Error>;

    /// Clear and draw the static labels of the live panel.
    fn draw_live_panel(&mut self) -> Result<(), Error>;

    fn draw_clock(&mut self, time: ClockTime) -> Result<(), Error>;

    fn draw_moisture(&mut self, moisture: i32) -> Result<(), Error>;

    fn draw_temperature(&mut self, celsius: f32) -> Result<(), Error>;

    fn draw_humidity(&mut self, percent: f32) -> Result<(), Error>;

    fn draw_status(&mut self, status: WateringStatus) -> Result<(), Error>;

    /// Clear and draw the sunflower. `None` draws the placeholder face shown
    /// on entering standby, before the first moisture reading.
    fn draw_standby(&mut self, mood: Option<Mood>) -> Result<(), Error>;

    /// Full-screen mode confirmation.
    fn draw_mode_banner(&mut self, mode: PlantMode) -> Result<(), Error>;

    /// Full-screen one-line message.
    fn draw_notice(&mut self, text: &str, tone: Tone) -> Result<(), Error>;
}

/// Local time of day.
pub trait WallClock {
    fn now(&self) -> ClockTime;
}

/// Blocking delay. Nothing else runs while it waits.
pub trait Pause {
    fn pause_ms(&mut self, ms: u32);
}
