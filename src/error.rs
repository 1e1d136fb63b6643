use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IftaError {
    #[error("Config directory not found at {0}. Run 'ifta init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("No report date selected. Use --date YYYY-MM-DD.")]
    MissingDate,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Date {0} is outside the selectable report range (use --force to submit anyway)")]
    DateNotSelectable(chrono::NaiveDate),

    #[error("Invalid month {0}. Expected 1-12")]
    InvalidMonth(u32),

    #[error("Invalid day {day} for {year}-{month:02} (month has {max} days)")]
    InvalidDay {
        year: i32,
        month: u32,
        day: u32,
        max: u32,
    },

    #[error("Year {year} is before the first reporting year {start}")]
    YearOutOfRange { year: i32, start: i32 },

    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No rows to export")]
    EmptyRows,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IftaError {
    /// True for failures that came from talking to the backend rather than local input.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            IftaError::Network { .. } | IftaError::HttpStatus { .. } | IftaError::MalformedResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IftaError>;
