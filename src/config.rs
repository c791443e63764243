//! Site secrets and board wiring.
//!
//! Secrets are baked in at compile time from the environment:
//!
//! ```text
//! AQUA_WIFI_SSID=... AQUA_WIFI_PASS=... \
//! AQUA_IOT_CONNECTION_STRING="HostName=...;DeviceId=...;SharedAccessSignature=..." \
//!   cargo build --release
//! ```
//!
//! Wiring (ESP32 DevKit):
//!
//! | Function              | Pins                                   |
//! |-----------------------|----------------------------------------|
//! | TFT ILI9341 (SPI2)    | SCLK 14, MOSI 13, CS 15, DC 2          |
//! | TFT backlight (LEDC)  | 27                                     |
//! | SD card (SPI3)        | SCLK 18, MOSI 23, MISO 19, CS 5        |
//! | VL53L0X (I2C0)        | SDA 21, SCL 22                         |
//! | DHT11                 | 26                                     |
//! | Relay                 | 25                                     |
//! | Moisture / microphone | 34 / 35 (ADC1)                         |
//! | Buttons A / B / C     | 32 / 33 / 4, active low                |
//! | GPS (UART1)           | TX 17, RX 16                           |

/// WiFi network name.
pub const WIFI_SSID: &str = match option_env!("AQUA_WIFI_SSID") {
  Some(ssid) => ssid,
  None => "",
};

/// WiFi passphrase.
pub const WIFI_PASS: &str = match option_env!("AQUA_WIFI_PASS") {
  Some(pass) => pass,
  None => "",
};

/// IoT Hub device connection string with a pre-generated SAS token.
pub const IOT_CONNECTION_STRING: &str = match option_env!("AQUA_IOT_CONNECTION_STRING") {
  Some(connection) => connection,
  None => "",
};

/// TFT SPI clock.
pub const TFT_SPI_MHZ: u32 = 26;

/// Backlight PWM frequency.
pub const BACKLIGHT_HZ: u32 = 5_000;

/// VL53L0X I2C clock.
pub const I2C_KHZ: u32 = 400;

/// GPS serial speed.
pub const GPS_BAUD: u32 = 9_600;

/// Where the SD card is mounted.
pub const SD_MOUNT_POINT: &str = "/sdcard";

/// Open file limit for the SD card mount.
pub const SD_MAX_FILES: usize = 4;
