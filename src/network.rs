use crate::config::{WIFI_PASS, WIFI_SSID};
use crate::error::AppError;
use aquabotanica_core::clock::ClockTime;
use aquabotanica_core::config::{NOTICE_MS, NTP_RETRY, NTP_SERVER, TIMEZONE_OFFSET_SECS, WIFI_RETRY};
use aquabotanica_core::hardware::{Pause, Screen, Tone, WallClock};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};
use std::time::{SystemTime, UNIX_EPOCH};

/// Station-mode WiFi driver.
pub type Wifi = BlockingWifi<EspWifi<'static>>;

/// Associate with the configured network, reporting progress on screen.
///
/// Association is retried per [`WIFI_RETRY`]; giving up is not fatal and the
/// device continues without connectivity.
///
/// # Parameters
/// - `modem`: The radio.
/// - `sysloop`: The system event loop.
/// - `nvs`: The default NVS partition, for radio calibration data.
/// - `screen`: Where the progress notices go.
/// - `pause`: Busy-wait between attempts and after the result notice.
///
/// # Returns
/// The WiFi driver, connected or not.
pub fn connect_wifi<S, P>(
  modem: Modem,
  sysloop: EspSystemEventLoop,
  nvs: EspDefaultNvsPartition,
  screen: &mut S,
  pause: &mut P
) -> Result<Wifi, AppError>
where
  S: Screen,
  P: Pause,
{
  notice(screen, "Verbinde mit WLAN...", Tone::Info);
  info!("Connecting to WiFi network {:?}", WIFI_SSID);

  let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;

  wifi.set_configuration(&Configuration::Client(ClientConfiguration {
    ssid: WIFI_SSID.try_into()
      .map_err(|_| AppError::ConfigError(format!("WiFi SSID {:?} is too long", WIFI_SSID)))?,
    password: WIFI_PASS.try_into()
      .map_err(|_| AppError::ConfigError("WiFi passphrase is too long".into()))?,
    ..Default::default()
  }))?;
  wifi.start()?;

  let associated = WIFI_RETRY.run("WiFi association", pause, |_| {
    wifi.connect()?;
    wifi.wait_netif_up()
  });

  match associated {
    Ok(()) => {
      match wifi.wifi().sta_netif().get_ip_info() {
        Ok(ip_info) => info!("WLAN verbunden! IP: {}", ip_info.ip),
        Err(_) => info!("WLAN verbunden!"),
      }
      notice(screen, "WLAN verbunden!", Tone::Success);
    }
    Err(gave_up) => {
      warn!("WLAN fehlgeschlagen! Last error: {:?}", gave_up.last_error);
      notice(screen, "WLAN fehlgeschlagen!", Tone::Failure);
    }
  }
  pause.pause_ms(NOTICE_MS);

  Ok(wifi)
}

/// Start SNTP and block until the first synchronization completes.
///
/// Retried per [`NTP_RETRY`], i.e. until it succeeds.
///
/// # Parameters
/// - `pause`: Busy-wait between polls.
///
/// # Returns
/// The running SNTP service, which keeps the system clock disciplined.
pub fn sync_time<P: Pause>(pause: &mut P) -> Result<EspSntp<'static>, AppError> {
  let mut conf = SntpConf::default();
  conf.servers[0] = NTP_SERVER;
  let sntp = EspSntp::new(&conf)?;

  let epoch = NTP_RETRY
    .run("Fetching NTP epoch time", pause, |_| {
      if sntp.get_sync_status() == SyncStatus::Completed {
        epoch_secs().ok_or("system clock before 1970")
      } else {
        Err("not synchronized yet")
      }
    })
    .map_err(|gave_up| AppError::NetworkError(format!(
      "Time sync gave up after {} attempt(s): {}",
      gave_up.attempts, gave_up.last_error
    )))?;

  info!("Fetched NTP epoch time is: {}", epoch);
  info!("Local time is {}", ClockTime::from_epoch(epoch, TIMEZONE_OFFSET_SECS).hms());

  Ok(sntp)
}

/// Seconds since the Unix epoch according to the system clock.
fn epoch_secs() -> Option<i64> {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .ok()
    .and_then(|elapsed| i64::try_from(elapsed.as_secs()).ok())
}

/// Show a startup notice; a display failure here is not worth stopping for.
fn notice<S: Screen>(screen: &mut S, text: &str, tone: Tone) {
  if let Err(e) = screen.draw_notice(text, tone) {
    warn!("Failed to show {:?}: {}", text, e);
  }
}

/// Local time from the SNTP-disciplined system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
  fn now(&self) -> ClockTime {
    ClockTime::from_epoch(epoch_secs().unwrap_or_default(), TIMEZONE_OFFSET_SECS)
  }
}
