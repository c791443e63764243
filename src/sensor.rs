use crate::error::AppError;
use aquabotanica_core::hardware::{Climate, Sensors};
use aquabotanica_core::mode::ModeButton;
use dht_sensor::dht11;
use enumset::EnumSet;
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::adc::ADC1;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::{AnyIOPin, Gpio34, Gpio35, Input, InputOutput, PinDriver};
use esp_idf_svc::hal::i2c::I2cDriver;
use esp_idf_svc::sys::esp_timer_get_time;
use log::{debug, warn};
use std::rc::Rc;

/// VL53L0X I2C address.
const VL53L0X_ADDRESS: u8 = 0x29;

/// Start a measurement.
const REG_SYSRANGE_START: u8 = 0x00;

/// Interrupt line configuration.
const REG_SYSTEM_INTERRUPT_CONFIG_GPIO: u8 = 0x0a;

/// Clear the measurement-ready interrupt.
const REG_SYSTEM_INTERRUPT_CLEAR: u8 = 0x0b;

/// Measurement-ready flag in the low three bits.
const REG_RESULT_INTERRUPT_STATUS: u8 = 0x13;

/// Range in millimetres, big-endian.
const REG_RESULT_RANGE_MM: u8 = 0x1e;

/// Model identification register.
const REG_IDENTIFICATION_MODEL_ID: u8 = 0xc0;

/// Expected model identification.
const VL53L0X_MODEL_ID: u8 = 0xee;

/// Interrupt on new sample ready.
const GPIO_NEW_SAMPLE_READY: u8 = 0x04;

/// I2C timeout in ticks.
const I2C_TIMEOUT: u32 = 100;

/// Polls before a single-shot measurement is given up.
const RANGE_POLLS: u32 = 100;

/// Range reported when the proximity sensor cannot be read, beyond any wake distance.
const NO_RANGE: u16 = u16::MAX;

/// Minimum time between two DHT11 conversions.
const DHT_MIN_INTERVAL_US: i64 = 2_000_000;

/// DHT11 temperature/humidity sensor on an open-drain data line.
pub struct Dht11<'a> {
  /// Open-drain data line.
  pin: PinDriver<'a, AnyIOPin, InputOutput>,

  /// Microsecond delay for the single-wire protocol.
  delay: Ets,

  /// Time and result of the last conversion.
  last: Option<(i64, Climate)>,
}

/// The DHT11 implementation.
impl<'a> Dht11<'a> {
  /// Create a new DHT11 sensor and release the data line.
  ///
  /// # Parameters
  /// - `pin`: The open-drain data pin.
  ///
  /// # Returns
  /// The DHT11 sensor.
  pub fn new(mut pin: PinDriver<'a, AnyIOPin, InputOutput>) -> Result<Self, AppError> {
    pin.set_high()
      .map_err(|e| AppError::SensorError(format!("Failed to release DHT11 data line: {:?}", e)))?;

    Ok(Self { pin, delay: Ets, last: None })
  }

  /// Read temperature and humidity.
  ///
  /// Conversions closer together than the sensor allows return the previous
  /// result. A failed conversion yields NaN for both values.
  ///
  /// # Returns
  /// The climate reading.
  pub fn read(&mut self) -> Climate {
    let now = micros();
    if let Some((at, climate)) = self.last {
      if now - at < DHT_MIN_INTERVAL_US {
        return climate;
      }
    }

    let climate = match self.convert() {
      Ok(climate) => climate,
      Err(e) => {
        warn!("{}", e);
        Climate { temperature: f32::NAN, humidity: f32::NAN }
      }
    };
    self.last = Some((now, climate));

    climate
  }

  /// Run one conversion.
  ///
  /// # Returns
  /// The climate reading.
  fn convert(&mut self) -> Result<Climate, AppError> {
    self.pin.set_high()
      .map_err(|e| AppError::SensorError(format!("Failed to release DHT11 data line: {:?}", e)))?;

    let reading = dht11::blocking::read(&mut self.delay, &mut self.pin)
      .map_err(|e| AppError::SensorError(format!("Failed to read DHT11: {:?}", e)))?;

    Ok(Climate {
      temperature: f32::from(reading.temperature),
      humidity: f32::from(reading.relative_humidity),
    })
  }
}

/// Microseconds since boot.
pub(crate) fn micros() -> i64 {
  // SAFETY: reads a monotonic counter; no preconditions.
  unsafe { esp_timer_get_time() }
}

/// VL53L0X time-of-flight proximity sensor.
pub struct Vl53l0x<'a> {
  /// The I2C driver.
  i2c: I2cDriver<'a>,
}

/// The VL53L0X implementation.
impl<'a> Vl53l0x<'a> {
  /// Create a new VL53L0X sensor, verifying that it answers.
  ///
  /// # Parameters
  /// - `i2c`: The I2C driver.
  ///
  /// # Returns
  /// The VL53L0X sensor.
  pub fn new(i2c: I2cDriver<'a>) -> Result<Self, AppError> {
    let mut sensor = Self { i2c };

    let model = sensor.read_register(REG_IDENTIFICATION_MODEL_ID)?;
    if model != VL53L0X_MODEL_ID {
      return Err(AppError::SensorError(format!(
        "Unexpected model ID 0x{:02x} at address 0x{:02x} (expected 0x{:02x})",
        model, VL53L0X_ADDRESS, VL53L0X_MODEL_ID
      )));
    }

    sensor.write_register(REG_SYSTEM_INTERRUPT_CONFIG_GPIO, GPIO_NEW_SAMPLE_READY)?;
    sensor.write_register(REG_SYSTEM_INTERRUPT_CLEAR, 0x01)?;

    Ok(sensor)
  }

  /// Run a single-shot range measurement.
  ///
  /// # Returns
  /// The range in millimetres.
  pub fn read_range(&mut self) -> Result<u16, AppError> {
    self.write_register(REG_SYSRANGE_START, 0x01)?;

    let mut polls = 0;
    while self.read_register(REG_RESULT_INTERRUPT_STATUS)? & 0x07 == 0 {
      polls += 1;
      if polls >= RANGE_POLLS {
        return Err(AppError::SensorError(format!(
          "Range measurement at address 0x{:02x} timed out",
          VL53L0X_ADDRESS
        )));
      }
      FreeRtos::delay_ms(1);
    }

    let mut buffer = [0u8; 2];
    self.i2c.write_read(VL53L0X_ADDRESS, &[REG_RESULT_RANGE_MM], &mut buffer, I2C_TIMEOUT)
      .map_err(|e| AppError::I2cError(format!(
        "Failed to read range from sensor at address 0x{:02x}: {:?}",
        VL53L0X_ADDRESS, e
      )))?;
    self.write_register(REG_SYSTEM_INTERRUPT_CLEAR, 0x01)?;

    Ok(u16::from_be_bytes(buffer))
  }

  /// Read one register.
  ///
  /// # Parameters
  /// - `register`: The register address.
  ///
  /// # Returns
  /// The register value.
  fn read_register(&mut self, register: u8) -> Result<u8, AppError> {
    let mut buffer = [0u8; 1];
    self.i2c.write_read(VL53L0X_ADDRESS, &[register], &mut buffer, I2C_TIMEOUT)
      .map_err(|e| AppError::I2cError(format!(
        "Failed to read register 0x{:02x} from sensor at address 0x{:02x}: {:?}",
        register, VL53L0X_ADDRESS, e
      )))?;

    Ok(buffer[0])
  }

  /// Write one register.
  ///
  /// # Parameters
  /// - `register`: The register address.
  /// - `value`: The value.
  ///
  /// # Returns
  /// The result of the operation.
  fn write_register(&mut self, register: u8, value: u8) -> Result<(), AppError> {
    self.i2c.write(VL53L0X_ADDRESS, &[register, value], I2C_TIMEOUT)
      .map_err(|e| AppError::I2cError(format!(
        "Failed to write 0x{:02x} to register 0x{:02x} of sensor at address 0x{:02x}: {:?}",
        value, register, VL53L0X_ADDRESS, e
      )))
  }
}

/// Shared ADC1 unit.
pub type Adc<'a> = Rc<AdcDriver<'a, ADC1>>;

/// Every sensor the station reads.
pub struct SensorHub<'a> {
  /// Soil moisture probe.
  moisture: AdcChannelDriver<'a, Gpio34, Adc<'a>>,

  /// Microphone amplitude.
  microphone: AdcChannelDriver<'a, Gpio35, Adc<'a>>,

  /// Temperature and humidity.
  dht: Dht11<'a>,

  /// Proximity.
  proximity: Vl53l0x<'a>,

  /// Mode buttons A, B and C, pulled up.
  buttons: [PinDriver<'a, AnyIOPin, Input>; 3],

  /// Last good moisture reading.
  last_moisture: i32,
}

/// The sensor hub implementation.
impl<'a> SensorHub<'a> {
  /// Create a new sensor hub.
  ///
  /// # Parameters
  /// - `moisture`: The moisture ADC channel.
  /// - `microphone`: The microphone ADC channel.
  /// - `dht`: The DHT11 sensor.
  /// - `proximity`: The proximity sensor.
  /// - `buttons`: The pulled-up button inputs A, B and C.
  ///
  /// # Returns
  /// The sensor hub.
  pub fn new(
    moisture: AdcChannelDriver<'a, Gpio34, Adc<'a>>,
    microphone: AdcChannelDriver<'a, Gpio35, Adc<'a>>,
    dht: Dht11<'a>,
    proximity: Vl53l0x<'a>,
    buttons: [PinDriver<'a, AnyIOPin, Input>; 3]
  ) -> Self {
    Self { moisture, microphone, dht, proximity, buttons, last_moisture: 0 }
  }
}

/// Scale a 12-bit conversion to the 10-bit range the thresholds use.
fn ten_bit(raw: u16) -> i32 {
  i32::from(raw >> 2)
}

impl Sensors for SensorHub<'_> {
  fn moisture(&mut self) -> i32 {
    match self.moisture.read() {
      Ok(raw) => self.last_moisture = ten_bit(raw),
      Err(e) => warn!("Failed to read moisture, keeping {}: {:?}", self.last_moisture, e),
    }

    self.last_moisture
  }

  fn climate(&mut self) -> Climate {
    self.dht.read()
  }

  fn distance_mm(&mut self) -> u16 {
    self.proximity.read_range().unwrap_or_else(|e| {
      debug!("{}", e);
      NO_RANGE
    })
  }

  fn microphone(&mut self) -> i32 {
    self.microphone.read().map(ten_bit).unwrap_or_else(|e| {
      debug!("Failed to read microphone: {:?}", e);
      0
    })
  }

  fn pressed_buttons(&mut self) -> EnumSet<ModeButton> {
    [ModeButton::A, ModeButton::B, ModeButton::C]
      .into_iter()
      .zip(self.buttons.iter())
      .filter(|(_, pin)| pin.is_low())
      .map(|(button, _)| button)
      .collect()
  }
}
