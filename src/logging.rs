/// Structured logging for the water quality service
///
/// Provides context-rich logging tagged with the collaborator that produced
/// the event and the sample or record it concerns. Events go through
/// `tracing`; `init_logger` installs a `tracing-subscriber` formatter that
/// writes to the console or appends to a log file.

use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::model::{GenerationError, RenderError, StoreError};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Store,
    Generator,
    Renderer,
    Core,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Store => write!(f, "DB"),
            DataSource::Generator => write!(f, "LLM"),
            DataSource::Renderer => write!(f, "PDF"),
            DataSource::Core => write!(f, "IQA"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the caller asked for something that does not exist
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("logger already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Initialize the global subscriber.
///
/// `RUST_LOG`, when set, overrides `min_level`. With a log file every event
/// is appended there with a timestamp; otherwise events go to stderr and
/// `console_timestamps` decides whether they carry one.
pub fn init_logger(
    min_level: LogLevel,
    log_file: Option<&str>,
    console_timestamps: bool,
) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.as_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::LogFile {
                    path: path.to_string(),
                    source,
                })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None if console_timestamps => builder.with_writer(std::io::stderr).try_init(),
        None => builder.with_writer(std::io::stderr).without_time().try_init(),
    };

    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: DataSource, key: Option<&str>, message: &str) {
    tracing::info!(source = %source, key = key.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: DataSource, key: Option<&str>, message: &str) {
    tracing::warn!(source = %source, key = key.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: DataSource, key: Option<&str>, message: &str) {
    tracing::error!(source = %source, key = key.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: DataSource, key: Option<&str>, message: &str) {
    tracing::debug!(source = %source, key = key.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a record store failure
pub fn classify_store_failure(err: &StoreError) -> FailureType {
    match err {
        // Lookups for rows that do not exist and malformed dates are the
        // caller's problem, not the database's.
        StoreError::NotFound(_) | StoreError::NewsNotFound(_) | StoreError::InvalidDate(_) => {
            FailureType::Expected
        }
        StoreError::Connection(_) | StoreError::Query(_) => FailureType::Unexpected,
        StoreError::Decode(_) => FailureType::Unknown,
    }
}

/// Classify a text-generation failure
pub fn classify_generation_failure(err: &GenerationError) -> FailureType {
    match err {
        GenerationError::MissingApiKey => FailureType::Unexpected,
        GenerationError::Http(code) if *code == 429 || *code >= 500 => FailureType::Unknown,
        GenerationError::Http(_) => FailureType::Unexpected,
        GenerationError::Request(e) if e.is_timeout() => FailureType::Unknown,
        GenerationError::Request(_) => FailureType::Unexpected,
        GenerationError::EmptyResponse => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

fn log_classified(source: DataSource, key: &str, operation: &str, failure_type: FailureType, err: &dyn std::error::Error) {
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(source, Some(key), &message),
        FailureType::Unexpected => error(source, Some(key), &message),
        FailureType::Unknown => warn(source, Some(key), &message),
    }
}

/// Log a record store failure with automatic classification
pub fn log_store_failure(key: &str, operation: &str, err: &StoreError) {
    log_classified(DataSource::Store, key, operation, classify_store_failure(err), err);
}

/// Log a text-generation failure with classification
pub fn log_generation_failure(key: &str, operation: &str, err: &GenerationError) {
    log_classified(DataSource::Generator, key, operation, classify_generation_failure(err), err);
}

/// Log a rendering failure. Rendering runs on data we built ourselves, so
/// every failure is unexpected.
pub fn log_render_failure(key: &str, operation: &str, err: &RenderError) {
    log_classified(DataSource::Renderer, key, operation, FailureType::Unexpected, err);
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a batch scoring pass
pub fn log_batch_summary(source: DataSource, total: usize, scored: usize, incomplete: usize) {
    let message = format!(
        "Scoring complete: {}/{} scored, {} incomplete",
        scored,
        total,
        incomplete
    );

    if incomplete == 0 {
        info(source, None, &message);
    } else if scored == 0 && total > 0 {
        warn(source, None, &message);
    } else {
        debug(source, None, &message);
    }
}
