use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImporterError {
    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed input in row {row}, field {field}: {message}")]
    MalformedInput {
        row: usize,
        field: &'static str,
        message: String,
    },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Remote rule listing is unusable: {0}")]
    RemoteListing(String),
}

impl ImporterError {
    /// Shorthand for a row-level input error
    pub fn malformed(row: usize, field: &'static str, message: impl Into<String>) -> Self {
        ImporterError::MalformedInput {
            row,
            field,
            message: message.into(),
        }
    }

    /// Attach a row number to a row-less input error raised by a field helper
    pub fn at_row(self, row: usize) -> Self {
        match self {
            ImporterError::MalformedInput { field, message, .. } => {
                ImporterError::MalformedInput { row, field, message }
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImporterError>;
