use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unsupported input format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Input file has no header row: {path}")]
    EmptyInput { path: String },

    #[error("Report rendering error: {message}")]
    ReportError { message: String },

    #[error("Chart rendering error: {message}")]
    ChartError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Processing,
    Output,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CrmError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CrmError::ConfigValidationError { .. }
            | CrmError::InvalidConfigValueError { .. }
            | CrmError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CrmError::CsvError(_)
            | CrmError::SpreadsheetError(_)
            | CrmError::UnsupportedFormat { .. }
            | CrmError::EmptyInput { .. } => ErrorCategory::Input,
            CrmError::ProcessingError { .. } | CrmError::SerializationError(_) => {
                ErrorCategory::Processing
            }
            CrmError::ZipError(_) | CrmError::ReportError { .. } | CrmError::ChartError { .. } => {
                ErrorCategory::Output
            }
            CrmError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Processing | ErrorCategory::Output => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CrmError::ConfigValidationError { .. } => "Check the profile TOML syntax and field names",
            CrmError::InvalidConfigValueError { .. } => "Fix the value named above and run again",
            CrmError::MissingConfigError { .. } => "Add the missing setting to the CLI flags or profile",
            CrmError::UnsupportedFormat { .. } => "Export the table as .csv, .tsv or .xlsx",
            CrmError::EmptyInput { .. } => "Make sure the first row of the file holds column names",
            CrmError::CsvError(_) => "Check the delimiter and quoting of the input file",
            CrmError::SpreadsheetError(_) => "Re-save the workbook or export its first sheet as CSV",
            CrmError::IoError(_) => "Check that the paths exist and are writable",
            CrmError::ZipError(_) => "Run again without --bundle to write loose files",
            CrmError::ReportError { .. } | CrmError::ChartError { .. } => {
                "Run with --verbose to see which artifact failed"
            }
            CrmError::SerializationError(_) | CrmError::ProcessingError { .. } => {
                "Run with --verbose and inspect the offending rows"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Could not read the input table: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
            ErrorCategory::Output => format!("Could not write the outputs: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub(crate) fn report<E: std::fmt::Display>(e: E) -> Self {
        CrmError::ReportError {
            message: e.to_string(),
        }
    }

    pub(crate) fn chart<E: std::fmt::Display>(e: E) -> Self {
        CrmError::ChartError {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = CrmError::UnsupportedFormat {
            extension: "pdf".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = CrmError::IoError(std::io::Error::other("disk full"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = CrmError::chart("backend closed");
        assert_eq!(err.category(), ErrorCategory::Output);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_user_friendly_message_mentions_cause() {
        let err = CrmError::MissingConfigError {
            field: "input".to_string(),
        };
        let message = err.user_friendly_message();
        assert!(message.starts_with("Configuration problem"));
        assert!(message.contains("input"));
    }
}
