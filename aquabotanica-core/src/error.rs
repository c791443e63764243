/// Core error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid or incomplete configuration.
    Config(String),

    /// Display error.
    Display(String),

    /// Location decoding error.
    Location(String),

    /// Relay output error.
    Relay(String),

    /// Sensor error.
    Sensor(String),

    /// Persistent log error.
    Storage(String),

    /// Remote transport error.
    Transport(String),
}

/// Implementation of the `Display` trait for `Error`.
impl core::fmt::Display for Error {
    /// Format the error message.
    ///
    /// # Arguments
    /// * `f` - The formatter to write the error message to.
    ///
    /// # Returns
    /// * `core::fmt::Result` - The result of the formatting operation.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Config error: {msg}"),
            Error::Display(msg) => write!(f, "Display error: {msg}"),
            Error::Location(msg) => write!(f, "Location error: {msg}"),
            Error::Relay(msg) => write!(f, "Relay error: {msg}"),
            Error::Sensor(msg) => write!(f, "Sensor error: {msg}"),
            Error::Storage(msg) => write!(f, "Storage error: {msg}"),
            Error::Transport(msg) => write!(f, "Transport error: {msg}"),
        }
    }
}

/// Implementation of the `Error` trait for `Error`.
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_concern() {
        assert_eq!(
            Error::Storage("card removed".into()).to_string(),
            "Storage error: card removed"
        );
        assert_eq!(
            Error::Transport("no client".into()).to_string(),
            "Transport error: no client"
        );
    }
}
