use esp_idf_svc::sys::EspError;
use std::fmt;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Configuration error.
    ConfigError(String),

    /// Display error.
    DisplayError(String),

    /// I2C error.
    I2cError(String),

    /// Network error.
    NetworkError(String),

    /// Peripherals error.
    PeripheralsError(String),

    /// Sensor error.
    SensorError(String),

    /// Storage error.
    StorageError(String),

    /// Transport error.
    TransportError(String),
}

/// Implement the conversion from `EspError` to `AppError`.
impl From<EspError> for AppError {
    /// Convert an `EspError` to an `AppError`.
    ///
    /// # Parameters
    /// - `error`: The ESP-IDF error.
    ///
    /// # Returns
    /// The application error.
    fn from(error: EspError) -> Self {
        AppError::PeripheralsError(format!("ESP-IDF error: {:?}", error))
    }
}

/// Implement the conversion from the control logic error to `AppError`.
impl From<aquabotanica_core::Error> for AppError {
    /// Map each control logic concern onto the matching application concern.
    ///
    /// # Parameters
    /// - `error`: The control logic error.
    ///
    /// # Returns
    /// The application error.
    fn from(error: aquabotanica_core::Error) -> Self {
        use aquabotanica_core::Error;

        match error {
            Error::Config(msg) => AppError::ConfigError(msg),
            Error::Display(msg) => AppError::DisplayError(msg),
            Error::Location(msg) | Error::Sensor(msg) => AppError::SensorError(msg),
            Error::Relay(msg) => AppError::PeripheralsError(msg),
            Error::Storage(msg) => AppError::StorageError(msg),
            Error::Transport(msg) => AppError::TransportError(msg),
        }
    }
}

/// Implement the conversion from `std::io::Error` to `AppError`.
impl From<std::io::Error> for AppError {
    /// Convert a file system error to an `AppError`.
    ///
    /// # Parameters
    /// - `error`: The I/O error.
    ///
    /// # Returns
    /// The application error.
    fn from(error: std::io::Error) -> Self {
        AppError::StorageError(format!("I/O error: {}", error))
    }
}

/// Implement the `Display` trait for `AppError`.
impl fmt::Display for AppError {
    /// Format the error message.
    ///
    /// # Parameters
    /// - `f`: The formatter.
    ///
    /// # Returns
    /// The result of the operation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::DisplayError(msg) => write!(f, "Display error: {}", msg),
            AppError::I2cError(msg) => write!(f, "I2C error: {}", msg),
            AppError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            AppError::PeripheralsError(msg) => write!(f, "Peripherals error: {}", msg),
            AppError::SensorError(msg) => write!(f, "Sensor error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppError::TransportError(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

/// Implement the `Error` trait for `AppError`.
impl std::error::Error for AppError {}

/// Convert an `AppError` raised inside a driver into the control logic error
/// for the same concern.
impl From<AppError> for aquabotanica_core::Error {
    fn from(error: AppError) -> Self {
        use aquabotanica_core::Error;

        match error {
            AppError::ConfigError(msg) => Error::Config(msg),
            AppError::DisplayError(msg) => Error::Display(msg),
            AppError::I2cError(msg) | AppError::SensorError(msg) => Error::Sensor(msg),
            AppError::PeripheralsError(msg) => Error::Relay(msg),
            AppError::StorageError(msg) => Error::Storage(msg),
            AppError::NetworkError(msg) | AppError::TransportError(msg) => Error::Transport(msg),
        }
    }
}
