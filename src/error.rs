use std::fmt;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by document, settings and batch operations
#[derive(Debug, Clone)]
pub enum Error {
    /// Source file or folder does not exist
    NotFound { path: String },

    /// File I/O error (read, write, rename)
    Io { path: String, message: String },

    /// JSON (de)serialization error
    Json { message: String },

    /// External process failed to launch or exited badly
    Process { program: String, message: String },

    /// A batch is already running
    Busy,

    /// Invalid color format
    InvalidColor { value: String, reason: String },

    /// Section or key that cannot be written as an INI line
    InvalidEntry {
        section: String,
        key: String,
        reason: String,
    },

    /// Custom error with message
    Custom { message: String },
}

impl Error {
    /// Create a not found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Create an I/O error
    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a process error
    pub fn process(program: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Process {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create an invalid color error
    pub fn invalid_color(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidColor {
            value: value.into(),
            reason: reason.into(),
        }
    }


    /// Create an invalid entry error
    pub fn invalid_entry(
        section: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidEntry {
            section: section.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a custom error
    pub fn custom(message: impl Into<String>) -> Self {
        Error::Custom {
            message: message.into(),
        }
    }

    /// Map an `io::Error` for `path`, turning `NotFound` into [`Error::NotFound`]
    pub fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound { path }
        } else {
            Error::Io {
                path,
                message: err.to_string(),
            }
        }
    }

    /// Whether this is a missing file/folder
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { path } => write!(f, "File not found: '{}'", path),
            Error::Io { path, message } => write!(f, "I/O error for '{}': {}", path, message),
            Error::Json { message } => write!(f, "JSON error: {}", message),
            Error::Process { program, message } => {
                write!(f, "Process '{}' failed: {}", program, message)
            }
            Error::Busy => write!(f, "A batch is already running"),
            Error::InvalidColor { value, reason } => {
                write!(f, "Invalid color '{}': {}", value, reason)
            }
            Error::InvalidEntry {
                section,
                key,
                reason,
            } => write!(f, "Cannot write [{}] {}: {}", section, key, reason),
            Error::Custom { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let mapped = Error::from_io("/tmp/x.ini", err);
        assert!(mapped.is_not_found());
        assert_eq!(mapped.to_string(), "File not found: '/tmp/x.ini'");
    }

    #[test]
    fn test_other_io_mapping() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let mapped = Error::from_io("a.ini", err);
        assert!(!mapped.is_not_found());
        assert!(matches!(mapped, Error::Io { .. }));
    }

    #[test]
    fn test_invalid_entry_display() {
        let err = Error::invalid_entry("A", "a=b", "key contains '='");
        assert_eq!(err.to_string(), "Cannot write [A] a=b: key contains '='");
    }
}
