use crate::error::AppError;
use aquabotanica_core::hardware::Relay;
use aquabotanica_core::Error;
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};

/// Watering pump relay, active high.
pub struct PumpRelay<'a> {
  /// The relay pin.
  pin: PinDriver<'a, AnyOutputPin, Output>,
}

/// The pump relay implementation.
impl<'a> PumpRelay<'a> {
  /// Create a new pump relay, switched off.
  ///
  /// # Parameters
  /// - `pin`: The relay output pin.
  ///
  /// # Returns
  /// The pump relay.
  pub fn new(mut pin: PinDriver<'a, AnyOutputPin, Output>) -> Result<Self, AppError> {
    pin.set_low()
      .map_err(|e| AppError::PeripheralsError(format!("Failed to switch relay off: {:?}", e)))?;

    Ok(Self { pin })
  }
}

impl Relay for PumpRelay<'_> {
  fn set(&mut self, on: bool) -> Result<(), Error> {
    self.pin.set_level(on.into())
      .map_err(|e| Error::Relay(format!("Failed to switch relay {}: {:?}", if on { "on" } else { "off" }, e)))
  }
}
