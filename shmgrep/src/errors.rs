use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations
pub type GrepResult<T> = Result<T, GrepError>;

/// Errors that can occur while driving the mailbox pipeline or the search
#[derive(Error, Debug)]
pub enum GrepError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    /// A shared memory object or named semaphore could not be created,
    /// attached, or operated on.
    #[error("{op} failed for `{name}`: {source}")]
    Resource {
        op: &'static str,
        name: String,
        source: std::io::Error,
    },
    /// A message does not fit the mailbox slot. Rejected, never truncated.
    #[error("message of {len} bytes exceeds slot capacity of {capacity}")]
    OversizedMessage { len: usize, capacity: usize },
    /// The mailbox slot held bytes that do not decode as a frame.
    #[error("malformed frame in mailbox slot: {0}")]
    MalformedFrame(String),
    /// A matcher shard failed; surfaced once after all shards have joined.
    #[error("search task failed: {0}")]
    TaskFailure(String),
    #[error("worker process exited with status {0}")]
    Worker(i32),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid UTF-8 in {what}: {source}")]
    Encoding {
        what: String,
        source: std::string::FromUtf8Error,
    },
}

impl GrepError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn resource(op: &'static str, name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Resource {
            op,
            name: name.into(),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn task_failure(msg: impl Into<String>) -> Self {
        Self::TaskFailure(msg.into())
    }

    pub fn encoding_error(what: impl Into<String>, source: std::string::FromUtf8Error) -> Self {
        Self::Encoding {
            what: what.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let path = Path::new("lines.txt");
        let err = GrepError::file_not_found(path);
        assert!(matches!(err, GrepError::FileNotFound(_)));

        let err = GrepError::permission_denied(path);
        assert!(matches!(err, GrepError::PermissionDenied(_)));

        let err = GrepError::invalid_pattern("empty word");
        assert!(matches!(err, GrepError::InvalidPattern(_)));

        let err = GrepError::resource(
            "sem_open",
            "/shmgrep-x",
            std::io::Error::from_raw_os_error(17),
        );
        assert!(matches!(err, GrepError::Resource { .. }));

        let err = GrepError::task_failure("shard 2 panicked");
        assert!(matches!(err, GrepError::TaskFailure(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = GrepError::OversizedMessage {
            len: 300,
            capacity: 256,
        };
        assert_eq!(
            err.to_string(),
            "message of 300 bytes exceeds slot capacity of 256"
        );

        let err = GrepError::file_not_found("lines.txt");
        assert_eq!(err.to_string(), "File not found: lines.txt");

        let err = GrepError::Worker(3);
        assert_eq!(err.to_string(), "worker process exited with status 3");

        let err = GrepError::config_error("missing word");
        assert_eq!(err.to_string(), "Configuration error: missing word");
    }
}
