use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input is not valid UTF-8 text")]
    NotUtf8,

    #[error("input is empty")]
    EmptyInput,

    #[error("CSV is missing a header row")]
    MissingHeader,

    #[error("missing columns in CSV: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("no usable rows found after parsing")]
    NoUsableData,

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote predictor error: {0}")]
    Predictor(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// True for the "well-formed but nothing to work with" outcome, which
    /// callers distinguish from malformed input.
    pub fn is_no_usable_data(&self) -> bool {
        matches!(self, PipelineError::NoUsableData)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
