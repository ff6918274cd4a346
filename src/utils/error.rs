use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Zip operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Credentials error: {message}")]
    Credentials { message: String },

    #[error("{source_name} responded with HTTP {status}: {body}")]
    SourceStatus {
        source_name: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {collection}: {message}")]
    Decode { collection: String, message: String },

    #[error("Data processing error: {message}")]
    Processing { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TelemetryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TelemetryError::Http(_) | TelemetryError::SourceStatus { .. } => {
                ErrorCategory::Network
            }
            TelemetryError::Toml(_)
            | TelemetryError::Config { .. }
            | TelemetryError::InvalidConfigValue { .. }
            | TelemetryError::MissingConfig { .. }
            | TelemetryError::Credentials { .. } => ErrorCategory::Configuration,
            TelemetryError::Csv(_)
            | TelemetryError::Serialization(_)
            | TelemetryError::Decode { .. }
            | TelemetryError::Processing { .. } => ErrorCategory::Data,
            TelemetryError::Zip(_) => ErrorCategory::Storage,
            TelemetryError::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TelemetryError::Http(_) => ErrorSeverity::Medium,
            TelemetryError::SourceStatus { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            TelemetryError::SourceStatus { .. } => ErrorSeverity::High,
            TelemetryError::Decode { .. } => ErrorSeverity::Low,
            TelemetryError::Csv(_)
            | TelemetryError::Serialization(_)
            | TelemetryError::Processing { .. }
            | TelemetryError::Zip(_) => ErrorSeverity::High,
            TelemetryError::Toml(_)
            | TelemetryError::Config { .. }
            | TelemetryError::InvalidConfigValue { .. }
            | TelemetryError::MissingConfig { .. }
            | TelemetryError::Credentials { .. } => ErrorSeverity::High,
            TelemetryError::Io(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether a request that failed this way is worth sending again.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            TelemetryError::SourceStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            TelemetryError::Http(_) => {
                "Check network connectivity and the Firebase database URL".to_string()
            }
            TelemetryError::SourceStatus { status: 401, .. }
            | TelemetryError::SourceStatus { status: 403, .. } => {
                "Check that FIREBASE_AUTH_TOKEN is valid and has read access".to_string()
            }
            TelemetryError::SourceStatus { status: 404, .. } => {
                "Check the project id and collection names".to_string()
            }
            TelemetryError::SourceStatus { .. } => {
                "Firebase is unavailable; the next refresh will retry".to_string()
            }
            TelemetryError::Credentials { .. } => {
                "Export FIREBASE_CREDENTIALS with the service account JSON".to_string()
            }
            TelemetryError::Toml(_) | TelemetryError::Config { .. } => {
                "Check the configuration file syntax".to_string()
            }
            TelemetryError::InvalidConfigValue { field, .. } => {
                format!("Fix the value of '{}'", field)
            }
            TelemetryError::MissingConfig { field } => {
                format!("Provide a value for '{}'", field)
            }
            TelemetryError::Decode { .. } => {
                "The Hat firmware may be writing an unexpected record shape".to_string()
            }
            TelemetryError::Io(_) | TelemetryError::Zip(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
            TelemetryError::Csv(_)
            | TelemetryError::Serialization(_)
            | TelemetryError::Processing { .. } => {
                "Re-run with --verbose and inspect the offending records".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach Firebase: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Telemetry data problem: {}", self),
            ErrorCategory::Storage => format!("Could not write dashboard output: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Process exit code used by the binaries.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
