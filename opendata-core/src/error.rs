/// Structured error types for opendata-core.
///
/// Uses `thiserror` so library consumers get composable errors; the CLI wraps
/// them in `anyhow` with extra context.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for export and source operations
#[derive(Error, Debug)]
pub enum OpenDataError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// JSON parsing failed
    #[error("JSON error at {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// Delimited-text writer failed
    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// Zip container could not be written
    #[error("archive error: {source}")]
    Archive {
        #[from]
        source: zip::result::ZipError,
    },

    /// Record is not a flat object of scalar fields
    #[error("Invalid record at {context}: {reason}")]
    InvalidRecord { context: String, reason: String },

    /// Invalid timestamp format
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Partition descriptor outside its domain
    #[error("Invalid partition: {reason}")]
    InvalidPartition { reason: String },

    /// File or directory not found
    #[error("Path not found: {path:?}")]
    PathNotFound { path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Report template failed to compile or render
    #[error("Render error: {source}")]
    Render {
        #[from]
        source: RenderError,
    },
}

/// Errors raised while compiling a template or evaluating helpers.
///
/// Every variant aborts the current render; nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Template syntax error at a byte offset
    #[error("template syntax error at byte {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    #[error("unknown helper '{name}'")]
    UnknownHelper { name: String },

    /// Block helper used as `{{name ...}}`
    #[error("helper '{name}' must be used as a block ({{{{#{name} ...}}}})")]
    BlockRequired { name: String },

    /// Inline helper used as `{{#name ...}}`
    #[error("helper '{name}' cannot open a block")]
    NotABlock { name: String },

    #[error("{helper}: missing parameter {position}")]
    MissingParam { helper: String, position: usize },

    /// Numeric text that does not parse; points at bad upstream data
    #[error("{helper}: '{value}' is not a number")]
    MalformedNumber { helper: String, value: String },

    #[error("{helper}: '{value}' is not a yyyy-MM-dd HH:mm:ss timestamp")]
    MalformedTimestamp { helper: String, value: String },

    #[error("{helper}: {reason}")]
    InvalidArgument { helper: String, reason: String },
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl RenderError {
    pub fn parse(offset: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            reason: reason.into(),
        }
    }

    pub fn unknown_helper(name: impl Into<String>) -> Self {
        Self::UnknownHelper { name: name.into() }
    }

    pub fn missing_param(helper: impl Into<String>, position: usize) -> Self {
        Self::MissingParam {
            helper: helper.into(),
            position,
        }
    }

    pub fn malformed_number(helper: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedNumber {
            helper: helper.into(),
            value: value.into(),
        }
    }

    pub fn malformed_timestamp(helper: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            helper: helper.into(),
            value: value.into(),
        }
    }

    pub fn invalid_argument(helper: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            helper: helper.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for opendata-core operations
pub type Result<T> = std::result::Result<T, OpenDataError>;

impl OpenDataError {
    /// Create a JSON error with context
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_record(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid timestamp error
    pub fn invalid_timestamp(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_partition(reason: impl Into<String>) -> Self {
        Self::InvalidPartition {
            reason: reason.into(),
        }
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OpenDataError::invalid_record("line 3", "field 'tags' is not a scalar");
        assert_eq!(
            err.to_string(),
            "Invalid record at line 3: field 'tags' is not a scalar"
        );

        let err = OpenDataError::path_not_found("/tmp/records.ndjson");
        assert!(err.to_string().contains("Path not found"));
        assert!(err.to_string().contains("/tmp/records.ndjson"));
    }

    #[test]
    fn test_render_error_display() {
        let err = RenderError::malformed_number("toMbit", "12a");
        assert_eq!(err.to_string(), "toMbit: '12a' is not a number");

        let err = RenderError::BlockRequired {
            name: "ifCond".into(),
        };
        assert_eq!(
            err.to_string(),
            "helper 'ifCond' must be used as a block ({{#ifCond ...}})"
        );

        let wrapped: OpenDataError = RenderError::unknown_helper("frobnicate").into();
        assert!(wrapped.to_string().contains("unknown helper 'frobnicate'"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: OpenDataError = io_err.into();

        assert!(matches!(err, OpenDataError::Io { .. }));
    }
}
