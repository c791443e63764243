use crate::cloud::IotHubLink;
use crate::config::{BACKLIGHT_HZ, GPS_BAUD, I2C_KHZ, IOT_CONNECTION_STRING, TFT_SPI_MHZ};
use crate::display::{Ili9341, Tft};
use crate::error::AppError;
use crate::gps::UartGps;
use crate::network::{self, SystemClock, Wifi};
use crate::relay::PumpRelay;
use crate::sensor::{self, Dht11, SensorHub, Vl53l0x};
use crate::storage::SdLogStore;
use aquabotanica_core::clock::ClockTime;
use aquabotanica_core::config::NOTICE_MS;
use aquabotanica_core::datalog::DataLogger;
use aquabotanica_core::hardware::{Climate, Pause, Relay, Sensors, WallClock};
use aquabotanica_core::mode::ModeButton;
use aquabotanica_core::station::Station;
use enumset::EnumSet;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, IOPin, Input, OutputPin, PinDriver, Pull};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::hal::spi::config::{Config as SpiConfig, DriverConfig};
use esp_idf_svc::hal::spi::{Dma, SpiDeviceDriver, SpiDriver};
use esp_idf_svc::hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use log::{error, info};
use std::rc::Rc;

/// DMA buffer for the display bus.
const TFT_DMA_BYTES: usize = 4096;

/// Busy-wait on the FreeRTOS tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct Delay;

impl Pause for Delay {
  fn pause_ms(&mut self, ms: u32) {
    FreeRtos::delay_ms(ms);
  }
}

/// Everything the station reads and switches, behind one value.
pub struct Board<'a> {
  /// The sensors.
  sensors: SensorHub<'a>,

  /// The pump relay.
  relay: PumpRelay<'a>,

  /// The wall clock.
  clock: SystemClock,

  /// The busy-wait.
  delay: Delay,
}

impl Sensors for Board<'_> {
  fn moisture(&mut self) -> i32 {
    self.sensors.moisture()
  }

  fn climate(&mut self) -> Climate {
    self.sensors.climate()
  }

  fn distance_mm(&mut self) -> u16 {
    self.sensors.distance_mm()
  }

  fn microphone(&mut self) -> i32 {
    self.sensors.microphone()
  }

  fn pressed_buttons(&mut self) -> EnumSet<ModeButton> {
    self.sensors.pressed_buttons()
  }
}

impl Relay for Board<'_> {
  fn set(&mut self, on: bool) -> Result<(), aquabotanica_core::Error> {
    self.relay.set(on)
  }
}

impl WallClock for Board<'_> {
  fn now(&self) -> ClockTime {
    self.clock.now()
  }
}

impl Pause for Board<'_> {
  fn pause_ms(&mut self, ms: u32) {
    self.delay.pause_ms(ms);
  }
}

/// The station wired to the real hardware.
type DeviceStation = Station<Board<'static>, Tft<'static>, SdLogStore, IotHubLink, UartGps<'static>>;

/// The device manager interface.
pub struct DeviceManager {
  /// The control loop.
  station: DeviceStation,

  /// Keeps the radio up.
  _wifi: Wifi,

  /// Keeps the system clock synchronized.
  _sntp: EspSntp<'static>,
}

/// The device manager implementation.
impl DeviceManager {
  /// Bring up every peripheral and show the live panel.
  ///
  /// A missing proximity sensor, an unusable SD card or an uncreatable log
  /// file halt the device.
  ///
  /// # Parameters
  /// - `peripherals`: The ESP32 peripherals.
  ///
  /// # Returns
  /// The device manager.
  pub fn new(peripherals: Peripherals) -> Result<Self, AppError> {
    let pins = peripherals.pins;
    let mut delay = Delay;

    // GPS
    let uart = UartDriver::new(
      peripherals.uart1,
      pins.gpio17,
      pins.gpio16,
      Option::<AnyIOPin>::None,
      Option::<AnyIOPin>::None,
      &UartConfig::default().baudrate(Hertz(GPS_BAUD)),
    )
    .map_err(|e| AppError::PeripheralsError(format!("Failed to initialize GPS UART: {:?}", e)))?;
    let gps = UartGps::new(uart);

    // Buttons and relay
    let buttons = [
      button(pins.gpio32.downgrade())?,
      button(pins.gpio33.downgrade())?,
      button(pins.gpio4.downgrade())?,
    ];
    let relay = PumpRelay::new(PinDriver::output(pins.gpio25.downgrade_output())?)?;

    // Display
    let tft_spi = SpiDeviceDriver::new_single(
      peripherals.spi2,
      pins.gpio14,
      pins.gpio13,
      Option::<AnyIOPin>::None,
      Some(pins.gpio15),
      &DriverConfig::new().dma(Dma::Auto(TFT_DMA_BYTES)),
      &SpiConfig::new().baudrate(TFT_SPI_MHZ.MHz().into()),
    )
    .map_err(|e| AppError::DisplayError(format!("Failed to initialize display SPI: {:?}", e)))?;
    let dc = PinDriver::output(pins.gpio2.downgrade_output())?;

    let backlight_timer = LedcTimerDriver::new(
      peripherals.ledc.timer0,
      &TimerConfig::default().frequency(BACKLIGHT_HZ.Hz()),
    )?;
    let backlight = LedcDriver::new(peripherals.ledc.channel0, backlight_timer, pins.gpio27)?;

    let mut tft = Tft::new(Ili9341::new(tft_spi, dc), backlight)?;

    // Climate
    let mut dht_pin = PinDriver::input_output_od(pins.gpio26.downgrade())?;
    dht_pin.set_pull(Pull::Up)?;
    let dht = Dht11::new(dht_pin)?;

    // Proximity
    let i2c = I2cDriver::new(
      peripherals.i2c0,
      pins.gpio21,
      pins.gpio22,
      &I2cConfig::default().baudrate(I2C_KHZ.kHz().into()),
    )
    .map_err(|e| AppError::I2cError(format!("Failed to initialize I2C: {:?}", e)))?;

    let proximity = match Vl53l0x::new(i2c) {
      Ok(proximity) => {
        info!("VL53L0X sensor initialized");
        proximity
      }
      Err(e) => halt(&format!("VL53L0X sensor could not be initialized: {}", e)),
    };

    // Analog inputs
    let adc = Rc::new(AdcDriver::new(peripherals.adc1)?);
    let channel_config = AdcChannelConfig { attenuation: DB_11, ..Default::default() };
    let moisture = AdcChannelDriver::new(Rc::clone(&adc), pins.gpio34, &channel_config)?;
    let microphone = AdcChannelDriver::new(adc, pins.gpio35, &channel_config)?;

    // SD card and CSV header
    let sd_spi = SpiDriver::new(
      peripherals.spi3,
      pins.gpio18,
      pins.gpio23,
      Some(pins.gpio19),
      &DriverConfig::default(),
    )
    .map_err(|e| AppError::StorageError(format!("Failed to initialize SD SPI: {:?}", e)))?;

    let store = match SdLogStore::mount(sd_spi, pins.gpio5) {
      Ok(store) => store,
      Err(e) => halt(&format!("SD card could not be initialized: {}", e)),
    };

    let mut logger = DataLogger::new(store);
    if let Err(e) = logger.ensure_header() {
      halt(&format!("Could not create CSV file: {}", e));
    }

    // Network, time and cloud
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let wifi = network::connect_wifi(peripherals.modem, sysloop, nvs, &mut tft, &mut delay)?;
    let sntp = network::sync_time(&mut delay)?;
    let transport = IotHubLink::connect(IOT_CONNECTION_STRING);
    delay.pause_ms(NOTICE_MS);

    let board = Board {
      sensors: SensorHub::new(moisture, microphone, dht, proximity, buttons),
      relay,
      clock: SystemClock,
      delay,
    };

    let mut station = Station::new(board, tft, logger, transport, gps);
    station.start(now_ms())?;

    Ok(Self { station, _wifi: wifi, _sntp: sntp })
  }

  /// Run one loop iteration.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn update(&mut self) -> Result<(), AppError> {
    self.station.tick(now_ms())?;

    Ok(())
  }
}

/// Configure a pulled-up, active-low button input.
///
/// # Parameters
/// - `pin`: The button pin.
///
/// # Returns
/// The input driver.
fn button(pin: AnyIOPin) -> Result<PinDriver<'static, AnyIOPin, Input>, AppError> {
  let mut input = PinDriver::input(pin)?;
  input.set_pull(Pull::Up)?;

  Ok(input)
}

/// Milliseconds since boot, from the monotonic timer SNTP never steps.
fn now_ms() -> u64 {
  (sensor::micros() / 1000) as u64
}

/// Log why the device cannot run and stop here for good.
///
/// # Parameters
/// - `reason`: What failed.
pub fn halt(reason: &str) -> ! {
  error!("{}", reason);
  error!("Halted");

  loop {
    FreeRtos::delay_ms(1000);
  }
}
