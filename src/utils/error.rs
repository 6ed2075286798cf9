use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] tokio_postgres::Error),

    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Database,
    FileSystem,
    Data,
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,   // 可重試 (例如連線失敗)
            ErrorSeverity::High => 1,     // 處理或配置錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }
}

impl EtlError {
    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        EtlError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::DatabaseError(_) => ErrorCategory::Database,
            EtlError::WalkError(_) | EtlError::IoError(_) => ErrorCategory::FileSystem,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::DatabaseError(e) if e.as_db_error().is_none() => ErrorSeverity::Medium,
            EtlError::DatabaseError(_) => ErrorSeverity::High,
            EtlError::SerializationError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::DatabaseError(e) if e.as_db_error().is_none() => {
                "Check that the database is reachable and PGHOST/PGPORT are correct"
            }
            EtlError::DatabaseError(_) => {
                "Check that the businesses and service_areas tables exist with the expected columns"
            }
            EtlError::WalkError(_) | EtlError::IoError(_) => {
                "Check file permissions under the inventory root and the output directory"
            }
            EtlError::MissingConfigError { .. } => {
                "Export the missing environment variable (PGHOST, PGUSER, PGDATABASE) and retry"
            }
            EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => {
                "Fix the configuration value reported above and retry"
            }
            EtlError::SerializationError(_) => "Report this failure together with the input data",
            EtlError::ProcessingError { .. } | EtlError::ValidationError { .. } => {
                "Inspect the offending record and correct the source data"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Database => format!("Database operation failed: {}", self),
            ErrorCategory::FileSystem => format!("File system operation failed: {}", self),
            ErrorCategory::Data => format!("Could not process data: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_configuration_error() {
        let err = EtlError::MissingConfigError {
            field: "PGHOST".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity().exit_code(), 1);
        assert!(err.to_string().contains("PGHOST"));
        assert!(err.user_friendly_message().starts_with("Configuration problem"));
    }

    #[test]
    fn test_io_error_maps_to_file_system() {
        let err = EtlError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.category(), ErrorCategory::FileSystem);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_exit_codes_are_never_zero() {
        for severity in [
            ErrorSeverity::Medium,
            ErrorSeverity::High,
            ErrorSeverity::Critical,
        ] {
            assert_ne!(severity.exit_code(), 0);
        }
    }
}
