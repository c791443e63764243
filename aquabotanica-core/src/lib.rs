//! Hardware-free logic for the AquaBotanica plant-watering monitor.
//!
//! Everything that decides *what* the device does lives here: moisture
//! classification, watering modes, the live/standby display machine, the
//! periodic task table, retry policies, CSV logging, NMEA location decoding
//! and the telemetry record. The firmware crate only supplies the drivers
//! behind the traits in [`hardware`], [`datalog`] and [`telemetry`].

pub mod clock;
pub mod config;
pub mod datalog;
pub mod error;
pub mod hardware;
pub mod irrigation;
pub mod location;
pub mod mode;
pub mod retry;
pub mod schedule;
pub mod standby;
pub mod station;
pub mod telemetry;

pub use error::Error;
