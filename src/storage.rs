use crate::config::{SD_MAX_FILES, SD_MOUNT_POINT};
use crate::error::AppError;
use aquabotanica_core::config::LOG_FILE_NAME;
use aquabotanica_core::datalog::LogStore;
use aquabotanica_core::Error;
use esp_idf_svc::fs::fatfs::Fatfs;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::gpio::OutputPin;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::sd::spi::SdSpiHostDriver;
use esp_idf_svc::hal::sd::{SdCardConfiguration, SdCardDriver};
use esp_idf_svc::hal::spi::SpiDriver;
use esp_idf_svc::io::vfs::MountedFatfs;
use log::info;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// FAT volume on an SD card attached over SPI.
type SdVolume = MountedFatfs<Fatfs<SdCardDriver<SdSpiHostDriver<'static, SpiDriver<'static>>>>>;

/// The CSV log file on the SD card.
pub struct SdLogStore {
  /// Keeps the card mounted.
  _volume: SdVolume,

  /// Full path of the log file.
  path: PathBuf,
}

/// The SD log store implementation.
impl SdLogStore {
  /// Mount the card and point at the log file.
  ///
  /// # Parameters
  /// - `spi`: The SPI bus the card sits on.
  /// - `cs`: The card chip select.
  ///
  /// # Returns
  /// The log store.
  pub fn mount(
    spi: SpiDriver<'static>,
    cs: impl Peripheral<P = impl OutputPin> + 'static
  ) -> Result<Self, AppError> {
    let host = SdSpiHostDriver::new(
      spi,
      Some(cs),
      AnyIOPin::none(),
      AnyIOPin::none(),
      AnyIOPin::none(),
      #[cfg(not(any(
        esp_idf_version_major = "4",
        all(esp_idf_version_major = "5", esp_idf_version_minor = "0"),
        all(esp_idf_version_major = "5", esp_idf_version_minor = "1"),
      )))]
      None,
    )
    .map_err(|e| AppError::StorageError(format!("Failed to set up SD SPI host: {:?}", e)))?;

    let card = SdCardDriver::new_spi(host, &SdCardConfiguration::new())
      .map_err(|e| AppError::StorageError(format!("SD card not responding: {:?}", e)))?;

    let fatfs = Fatfs::new_sdcard(0, card)
      .map_err(|e| AppError::StorageError(format!("Failed to open FAT volume: {:?}", e)))?;

    let volume = MountedFatfs::mount(fatfs, SD_MOUNT_POINT, SD_MAX_FILES)
      .map_err(|e| AppError::StorageError(format!("Failed to mount SD card at {}: {:?}", SD_MOUNT_POINT, e)))?;

    let path = PathBuf::from(SD_MOUNT_POINT).join(LOG_FILE_NAME);
    info!("SD card mounted, logging to {}", path.display());

    Ok(Self { _volume: volume, path })
  }
}

impl LogStore for SdLogStore {
  fn exists(&self) -> bool {
    self.path.exists()
  }

  fn append_line(&mut self, line: &str) -> Result<(), Error> {
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)
      .map_err(|e| Error::Storage(format!("Failed to open {}: {}", self.path.display(), e)))?;

    writeln!(file, "{}", line)
      .map_err(|e| Error::Storage(format!("Failed to write {}: {}", self.path.display(), e)))
  }
}
