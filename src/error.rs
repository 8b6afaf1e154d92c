use thiserror::Error;

/// Numeric error codes reported to clients of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// Application database cannot be accessed.
    BadDb = 1,
    /// Application database has an unexpected schema version.
    BadSchemaVersion = 2,
    /// Calibre library path is empty.
    NoCalibrePath = 3,
    /// Calibre library cannot be accessed.
    BadCalibreDb = 4,
    /// JSON input cannot be decoded.
    BadJson = 5,
    /// Unknown configuration key found.
    UnknownConfig = 6,
    /// Malformed request input.
    BadInput = 7,
    /// Missing or malformed Kindle sender address.
    BadKindleFrom = 8,
    /// Page size out of bounds.
    BadPageSize = 9,
}

impl ErrorCode {
    /// Numeric value of the code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// No Calibre library directory configured.
    #[error("Calibre library path is empty")]
    NoCalibrePath,

    /// Calibre metadata database unusable.
    #[error("Calibre library error: {0}")]
    BadCalibreDb(String),

    /// Query against the Calibre database failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration key not recognised.
    #[error("Unknown configuration key: {0}")]
    UnknownConfig(String),

    /// Invalid caller input.
    #[error("Bad input: {0}")]
    BadInput(String),

    /// Kindle sender address missing or malformed.
    #[error("Bad Kindle sender address: {0:?}")]
    BadKindleFrom(Option<String>),

    /// Page size outside the accepted range.
    #[error("Page size out of bounds: {0}")]
    BadPageSize(u32),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Client-facing error code, if this error has one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::NoCalibrePath => Some(ErrorCode::NoCalibrePath),
            AppError::BadCalibreDb(_) | AppError::Database(_) => Some(ErrorCode::BadCalibreDb),
            AppError::Json(_) => Some(ErrorCode::BadJson),
            AppError::UnknownConfig(_) => Some(ErrorCode::UnknownConfig),
            AppError::BadInput(_) => Some(ErrorCode::BadInput),
            AppError::BadKindleFrom(_) => Some(ErrorCode::BadKindleFrom),
            AppError::BadPageSize(_) => Some(ErrorCode::BadPageSize),
            AppError::Io(_) | AppError::Config(_) => None,
        }
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
