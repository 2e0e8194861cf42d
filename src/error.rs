use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtlError>;

/// Coarse classification of a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Extraction,
    Transform,
    Load,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Config => "ConfigError",
            ErrorKind::Extraction => "ExtractionError",
            ErrorKind::Transform => "TransformError",
            ErrorKind::Load => "LoadError",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Malformed measurement #{index}: {message}")]
    MalformedRecord { index: usize, message: String },

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Load error: {0}")]
    Load(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::Config(_) | EtlError::ConfigSource(_) => ErrorKind::Config,
            EtlError::Extraction(_) | EtlError::Http(_) | EtlError::HttpStatus { .. } => {
                ErrorKind::Extraction
            }
            EtlError::MalformedRecord { .. } | EtlError::Transform(_) => ErrorKind::Transform,
            EtlError::Database(_) | EtlError::Load(_) | EtlError::Io(_) => ErrorKind::Load,
        }
    }

    /// Whether the next scheduled run can be expected to succeed without
    /// operator intervention. The watermark does not advance on failure, so
    /// transient extraction and store failures simply redo the run.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Extraction | ErrorKind::Load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(EtlError::Config("missing key".into()).kind(), ErrorKind::Config);
        assert_eq!(
            EtlError::HttpStatus {
                status: 401,
                body: "unauthorized".into()
            }
            .kind(),
            ErrorKind::Extraction
        );
        assert_eq!(
            EtlError::MalformedRecord {
                index: 3,
                message: "missing date.utc".into()
            }
            .kind(),
            ErrorKind::Transform
        );
        assert_eq!(EtlError::Load("rollback".into()).kind(), ErrorKind::Load);
    }

    #[test]
    fn test_retryable() {
        assert!(EtlError::Extraction("timeout".into()).is_retryable());
        assert!(EtlError::Load("locked".into()).is_retryable());
        assert!(!EtlError::Config("bad".into()).is_retryable());
        assert!(!EtlError::Transform("bad".into()).is_retryable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = EtlError::MalformedRecord {
            index: 7,
            message: "missing coordinates".into(),
        };
        assert_eq!(err.to_string(), "Malformed measurement #7: missing coordinates");
        assert_eq!(ErrorKind::Transform.to_string(), "TransformError");
    }
}
