//! Compiled-in behavioral constants.

use crate::irrigation::MoistureThreshold;
use crate::location::Coordinates;
use crate::retry::RetryPolicy;

/// Threshold bands indexed by mode (1..3).
pub const THRESHOLDS: [MoistureThreshold; 3] = [
    MoistureThreshold { low: 10, high: 200 },
    MoistureThreshold { low: 201, high: 400 },
    MoistureThreshold { low: 401, high: 600 },
];

/// Clock field refresh period while live.
pub const CLOCK_INTERVAL_MS: u64 = 1_000;

/// Sensor panel refresh period while live.
pub const SENSOR_INTERVAL_MS: u64 = 4_000;

/// Mood graphic refresh period while in standby.
pub const STANDBY_INTERVAL_MS: u64 = 4_000;

/// CSV log period.
pub const LOG_INTERVAL_MS: u64 = 4_000;

/// Telemetry upload period.
pub const TELEMETRY_INTERVAL_MS: u64 = 60_000;

/// Time without a wake signal after which the live panel gives way to standby.
pub const DISPLAY_TIMEOUT_MS: u64 = 20_000;

/// Proximity at or below this distance wakes the display.
pub const WAKE_DISTANCE_MM: u16 = 100;

/// Microphone amplitude above this level wakes the display.
pub const WAKE_MIC_LEVEL: i32 = 650;

/// Backlight while live.
pub const LIVE_BRIGHTNESS: u8 = 100;

/// Backlight while in standby.
pub const STANDBY_BRIGHTNESS: u8 = 20;

/// How long the mode confirmation stays on screen.
pub const MODE_BANNER_MS: u32 = 1_000;

/// How long startup notices stay on screen.
pub const NOTICE_MS: u32 = 2_000;

/// Used when the GPS has no valid fix.
pub const DEFAULT_LOCATION: Coordinates = Coordinates {
    latitude: 47.06895,
    longitude: 15.40643,
};

/// Identifier carried in every telemetry record.
pub const DEVICE_ID: &str = "Wio";

/// Added to the NTP epoch before deriving the wall-clock time.
pub const TIMEZONE_OFFSET_SECS: i64 = 3_600;

/// NTP server used for the initial time sync.
pub const NTP_SERVER: &str = "0.pool.ntp.org";

/// WiFi association: two attempts, half a second apart.
pub const WIFI_RETRY: RetryPolicy = RetryPolicy::bounded(2, 500);

/// Time sync: retried until it succeeds.
pub const NTP_RETRY: RetryPolicy = RetryPolicy::unbounded(2_000);

/// CSV file name on the storage card.
pub const LOG_FILE_NAME: &str = "sensors.csv";
