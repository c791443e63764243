mod cloud;
mod config;
mod device;
mod display;
mod error;
mod gps;
mod network;
mod relay;
mod sensor;
mod storage;

use crate::device::DeviceManager;
use crate::error::AppError;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::sys::link_patches;
use log::{error, info};

/// Pause between loop iterations, long enough to feed the idle task watchdog.
const LOOP_INTERVAL_MS: u32 = 10;

/// This function initializes the system and starts the main loop.
///
/// # Returns
/// The result of the operation.
fn main() -> Result<(), AppError> {
  // Initialize system
  link_patches();
  EspLogger::initialize_default();
  info!("Starting AquaBotanica...");

  let peripherals = Peripherals::take()
    .map_err(|_| AppError::PeripheralsError("Failed to acquire ESP32 peripherals".into()))?;

  // Initialize device manager
  let mut manager = DeviceManager::new(peripherals)?;

  // Main loop
  loop {
    if let Err(e) = manager.update() {
      error!("Loop iteration failed: {}", e);
    }
    FreeRtos::delay_ms(LOOP_INTERVAL_MS);
  }
}
