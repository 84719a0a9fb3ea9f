use thiserror::Error;

/// Unified error type for apscan
#[derive(Error, Debug)]
pub enum ApScanError {
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("Scan failed: {0}")]
    Scan(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Console closed")]
    Closed,
}

pub type ApScanResult<T> = Result<T, ApScanError>;
