/// Core error type for quill
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External error: {0}")]
    External(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A frequency tag the interval calculator cannot advance
    #[error("Invalid frequency: '{0}'")]
    InvalidFrequency(String),

    /// A record a generation context depends on could not be resolved
    #[error("Missing {kind} record: {id}")]
    MissingBackingRecord { kind: &'static str, id: String },
}

impl Error {
    pub fn missing(kind: &'static str, id: impl Into<String>) -> Self {
        Error::MissingBackingRecord {
            kind,
            id: id.into(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(format!("JSON error: {}", err))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
