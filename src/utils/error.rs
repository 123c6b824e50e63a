use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Source API unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("Destination API unavailable: {message}")]
    DestinationUnavailable { message: String },

    #[error("Destination protocol error: {message}")]
    DestinationProtocolError { message: String },

    #[error("No destination itinerary matches source itinerary {itinerary_id} on {date}")]
    IdentityNotFound { itinerary_id: i64, date: String },

    #[error("Dedup store error: {message}")]
    DedupStoreError { message: String },

    #[error("Invalid source record: {message}")]
    InvalidRecord { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::DedupStoreError {
            message: err.to_string(),
        }
    }
}

/// 錯誤分類，用於報表與日誌
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Destination,
    DestinationProtocol,
    IdentityNotFound,
    DedupStore,
    InvalidRecord,
    Configuration,
    Io,
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl SyncError {
    pub fn source_unavailable(err: impl std::fmt::Display) -> Self {
        SyncError::SourceUnavailable {
            message: err.to_string(),
        }
    }

    pub fn destination_unavailable(err: impl std::fmt::Display) -> Self {
        SyncError::DestinationUnavailable {
            message: err.to_string(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        SyncError::DestinationProtocolError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::SourceUnavailable { .. } => ErrorCategory::Source,
            SyncError::DestinationUnavailable { .. } => ErrorCategory::Destination,
            SyncError::DestinationProtocolError { .. } => ErrorCategory::DestinationProtocol,
            SyncError::IdentityNotFound { .. } => ErrorCategory::IdentityNotFound,
            SyncError::DedupStoreError { .. } => ErrorCategory::DedupStore,
            SyncError::InvalidRecord { .. } => ErrorCategory::InvalidRecord,
            SyncError::IoError(_) => ErrorCategory::Io,
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    /// 作為整體執行失敗時的嚴重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::IdentityNotFound | ErrorCategory::InvalidRecord => ErrorSeverity::Low,
            ErrorCategory::Destination | ErrorCategory::DestinationProtocol => {
                ErrorSeverity::Medium
            }
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Source | ErrorCategory::DedupStore | ErrorCategory::Io => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Source => {
                "Check the ticketing API base URL, token and network connectivity"
            }
            ErrorCategory::Destination => {
                "Check that the navigation API is running and the bearer token is valid"
            }
            ErrorCategory::DestinationProtocol => {
                "The navigation API answered with an unexpected body; check its version"
            }
            ErrorCategory::IdentityNotFound => {
                "Run an initial sync (-d) for this date before running updates"
            }
            ErrorCategory::DedupStore => {
                "Check permissions and free space of the store directory"
            }
            ErrorCategory::InvalidRecord => "Inspect the rejected record in the source system",
            ErrorCategory::Configuration => "Fix the configuration file and try again",
            ErrorCategory::Io => "Check file system permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::SourceUnavailable { .. } => {
                format!("Could not read from the ticketing API ({})", self)
            }
            SyncError::DestinationUnavailable { .. } => {
                format!("Could not write to the navigation API ({})", self)
            }
            SyncError::DedupStoreError { .. } => {
                format!("The local manifest store failed ({})", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
