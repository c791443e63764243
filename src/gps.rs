use aquabotanica_core::location::{Coordinates, GpsReceiver, LocationSource};
use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::uart::UartDriver;
use log::warn;

/// Serial GPS module.
pub struct UartGps<'a> {
  /// The UART the module talks on.
  uart: UartDriver<'a>,

  /// NMEA decoder.
  receiver: GpsReceiver,
}

/// The serial GPS implementation.
impl<'a> UartGps<'a> {
  /// Create a new serial GPS.
  ///
  /// # Parameters
  /// - `uart`: The UART driver, already set to the module's baud rate.
  ///
  /// # Returns
  /// The serial GPS.
  pub fn new(uart: UartDriver<'a>) -> Self {
    Self { uart, receiver: GpsReceiver::new() }
  }
}

impl LocationSource for UartGps<'_> {
  fn drain(&mut self) {
    let mut buffer = [0u8; 64];

    loop {
      match self.uart.read(&mut buffer, NON_BLOCK) {
        Ok(0) => break,
        Ok(read) => buffer[..read].iter().for_each(|byte| self.receiver.encode(*byte)),
        Err(e) => {
          warn!("Failed to read GPS serial: {:?}", e);
          break;
        }
      }
    }
  }

  fn fix(&self) -> Option<Coordinates> {
    self.receiver.fix()
  }
}
