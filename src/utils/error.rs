use std::time::Duration;
use thiserror::Error;

/// 頁面自動化層的錯誤
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Timed out after {timeout:?} waiting for: {selector}")]
    Timeout { selector: String, timeout: Duration },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("WebDriver command failed: {0}")]
    WebDriver(String),
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("No service mapping found for FleetLink IDs {identifiers:?}")]
    Resolution { identifiers: Vec<u64> },

    #[error("Option not found: '{target}' (available: {available:?})")]
    OptionNotFound {
        target: String,
        available: Vec<String>,
    },

    #[error("Service group not found: '{group}' (available: {available:?})")]
    ServiceGroupNotFound {
        group: String,
        available: Vec<String>,
    },

    #[error("Branch entries for postal code {postal_code} did not load after {attempts} attempts")]
    BranchesNotLoaded { postal_code: String, attempts: u32 },

    #[error("Page automation error: {0}")]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, BookingError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Mapping,
    Site,
    Browser,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BookingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BookingError::Resolution { .. } | BookingError::CsvError(_) => ErrorCategory::Mapping,
            BookingError::OptionNotFound { .. }
            | BookingError::ServiceGroupNotFound { .. }
            | BookingError::BranchesNotLoaded { .. } => ErrorCategory::Site,
            BookingError::Driver(_) => ErrorCategory::Browser,
            BookingError::ConfigError { .. }
            | BookingError::ConfigValidationError { .. }
            | BookingError::InvalidConfigValueError { .. }
            | BookingError::MissingConfigError { .. }
            | BookingError::ValidationError { .. } => ErrorCategory::Configuration,
            BookingError::IoError(_) | BookingError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Site | ErrorCategory::Browser => ErrorSeverity::Medium,
            ErrorCategory::Mapping | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 是否值得重新執行整個預約流程
    ///
    /// 對照表與設定錯誤是確定性的，重試不會改變結果。
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Mapping | ErrorCategory::Configuration
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BookingError::Resolution { .. } => {
                "Check that the FleetLink IDs exist in the mapping table"
            }
            BookingError::CsvError(_) => "Re-export the mapping spreadsheet as UTF-8 CSV",
            BookingError::OptionNotFound { .. } => {
                "Check manufacturer, model and year against the site's dropdown labels"
            }
            BookingError::ServiceGroupNotFound { .. } => {
                "The mapping table refers to a service group the site no longer offers"
            }
            BookingError::BranchesNotLoaded { .. } => {
                "Verify the postal code and that the site is reachable"
            }
            BookingError::Driver(DriverError::Session(_)) => {
                "Make sure geckodriver/chromedriver is running at the configured URL"
            }
            BookingError::Driver(_) => "The page layout may have changed; inspect the run log",
            BookingError::IoError(_) => "Check file permissions for the logs and screenshots directories",
            BookingError::SerializationError(_) => "Check that the job file is valid JSON",
            BookingError::ConfigError { .. }
            | BookingError::ConfigValidationError { .. }
            | BookingError::InvalidConfigValueError { .. }
            | BookingError::MissingConfigError { .. } => "Fix the configuration file and retry",
            BookingError::ValidationError { .. } => "Fix the job request and resubmit",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Mapping => format!("Service lookup failed: {}", self),
            ErrorCategory::Site => format!("Booking wizard failed: {}", self),
            ErrorCategory::Browser => format!("Browser automation failed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}
