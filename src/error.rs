use std::io;
use thiserror::Error;

/// Boxed error surfaced by third-party drivers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
    #[error("Unable to connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: BoxError,
    },
    #[error("Unable to encode value: {0}")]
    Encoding(#[source] serde_json::Error),
    #[error("Unable to decode value: {0}")]
    Decoding(#[source] serde_json::Error),
    #[error("Stored text is not valid UTF-8: {0}")]
    InvalidText(#[source] std::str::Utf8Error),
    #[error("Unknown value tag: {0:#04x}")]
    UnknownTag(u8),
    #[error("Invalid config value for {key}: {value}")]
    InvalidConfig { key: String, value: String },
    #[error(transparent)]
    Sled(#[from] sled::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Backend(BoxError),
}

impl Error {
    /// Whether the error came out of the underlying storage operation.
    pub fn is_backend(&self) -> bool {
        matches!(self, Error::Sled(_) | Error::Io(_) | Error::Backend(_))
    }
}

/// The Result type encapsulates standard result
pub type Result<T> = std::result::Result<T, Error>;
