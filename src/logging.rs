/// Structured logging for the aurora monitoring service
///
/// Provides context-rich logging with feed identifiers, timestamps, and
/// severity levels. Supports both console output and file-based logging
/// for unattended refresh loops. Nothing is printed until `init_logger`
/// has been called, so library users and tests stay quiet.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::FeedError;

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
    /// Parses a level name as written in config files or `AUROMON_LOG_LEVEL`.
    pub fn parse(name: &str) -> Option<LogLevel> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
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

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

/// The component a log line comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Any SWPC feed fetch or parse.
    Swpc,
    /// Spatial field builder.
    Field,
    /// Substorm detector.
    Substorm,
    /// Dashboard pass orchestration.
    Pipeline,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Swpc => write!(f, "SWPC"),
            DataSource::Field => write!(f, "FIELD"),
            DataSource::Substorm => write!(f, "SUBSTORM"),
            DataSource::Pipeline => write!(f, "PIPE"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the product is known to be intermittently empty
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

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, source: &DataSource, feed: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

        let feed_part = feed.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, source, feed_part, message);

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => eprintln!("   [DEBUG] {}", message),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, feed_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, feed_part, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, source: DataSource, feed: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &source, feed, message);
        }
    }
}

/// Log a general informational message
pub fn info(source: DataSource, feed: Option<&str>, message: &str) {
    emit(LogLevel::Info, source, feed, message);
}

/// Log a warning message
pub fn warn(source: DataSource, feed: Option<&str>, message: &str) {
    emit(LogLevel::Warning, source, feed, message);
}

/// Log an error message
pub fn error(source: DataSource, feed: Option<&str>, message: &str) {
    emit(LogLevel::Error, source, feed, message);
}

/// Log a debug message
pub fn debug(source: DataSource, feed: Option<&str>, message: &str) {
    emit(LogLevel::Debug, source, feed, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a feed failure based on the error type.
pub fn classify_feed_failure(err: &FeedError) -> FailureType {
    match err {
        // HTTP errors and broken payloads point at the provider or our URLs
        FeedError::Http(_) | FeedError::Parse(_) => FailureType::Unexpected,
        // SWPC regularly serves empty products between model runs
        FeedError::NoDataAvailable(_) => FailureType::Expected,
        FeedError::Transport(_) | FeedError::Timeout => FailureType::Unknown,
    }
}

/// Log a feed failure with automatic classification
pub fn log_fetch_failure(feed: &str, operation: &str, err: &FeedError) {
    let failure_type = classify_feed_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(DataSource::Swpc, Some(feed), &message),
        FailureType::Unexpected => error(DataSource::Swpc, Some(feed), &message),
        FailureType::Unknown => warn(DataSource::Swpc, Some(feed), &message),
    }
}

// ---------------------------------------------------------------------------
// Pass Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one fetch pass over all feeds
pub fn log_pass_summary(total: usize, available: usize, unavailable: usize) {
    let message = format!(
        "Fetch pass complete: {}/{} feeds available, {} unavailable",
        available, total, unavailable
    );

    if unavailable == 0 {
        info(DataSource::Pipeline, None, &message);
    } else if available == 0 {
        error(DataSource::Pipeline, None, &message);
    } else {
        warn(DataSource::Pipeline, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("INFO"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse(" warn "), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(classify_feed_failure(&FeedError::Http(500)), FailureType::Unexpected);
        assert_eq!(
            classify_feed_failure(&FeedError::Parse("expected value".into())),
            FailureType::Unexpected
        );
        assert_eq!(
            classify_feed_failure(&FeedError::NoDataAvailable("ovation-aurora".into())),
            FailureType::Expected
        );
        assert_eq!(classify_feed_failure(&FeedError::Timeout), FailureType::Unknown);
    }

    #[test]
    fn test_logging_before_init_is_silent() {
        // Must not panic or block when no logger has been installed.
        info(DataSource::System, None, "not initialized");
        log_pass_summary(3, 2, 1);
    }
}
