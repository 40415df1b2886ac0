use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for automigrate operations
///
/// Each kind names one failure category of the migration pipeline so callers
/// can tell a store failure from a render or filesystem failure without
/// parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use automigrate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
///
/// fn example() -> AutomigrateResult<()> {
///     Err(AutomigrateError::new("collection not found", ErrorKind::NotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Schema store errors
    /// The schema store failed to answer a query
    StoreError,
    /// The requested collection does not exist in the store
    NotFound,

    // Rendering errors
    /// A change list could not be turned into a script
    RenderError,
    /// Data could not be encoded as a script literal
    EncodingError,

    // Filesystem errors
    /// Generic IO error
    IOError,
    /// Permission denied for file operation
    PermissionDenied,
    /// A migration file with the same name already exists
    FileAlreadyExists,

    // Input errors
    /// A definition, label or change failed validation
    ValidationError,
    /// The configuration is invalid
    ConfigError,

    // Event errors
    /// Error in event processing
    EventError,
    /// An event arrived before the schema baseline was loaded
    BaselineNotLoaded,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::StoreError => write!(f, "Store error"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::RenderError => write!(f, "Render error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::FileAlreadyExists => write!(f, "File already exists"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::ConfigError => write!(f, "Configuration error"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::BaselineNotLoaded => write!(f, "Baseline not loaded"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type of the migration pipeline.
///
/// `AutomigrateError` carries a message, a kind, an optional cause and the
/// backtrace captured at construction.
///
/// # Examples
///
/// ```rust,ignore
/// use automigrate::errors::{AutomigrateError, ErrorKind};
///
/// let cause = AutomigrateError::new("disk full", ErrorKind::IOError);
/// let err = AutomigrateError::new_with_cause(
///     "failed to save migration file",
///     ErrorKind::IOError,
///     cause,
/// );
/// ```
#[derive(Clone)]
pub struct AutomigrateError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<AutomigrateError>>,
    backtrace: Atomic<Backtrace>,
}

impl AutomigrateError {
    /// Creates a new error with the specified message and kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        AutomigrateError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new error chained to the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: AutomigrateError) -> Self {
        AutomigrateError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&AutomigrateError> {
        self.cause.as_deref()
    }

    /// Returns `true` when the error reports a missing collection.
    pub fn is_not_found(&self) -> bool {
        self.error_kind == ErrorKind::NotFound
    }
}

impl Display for AutomigrateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Debug for AutomigrateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for AutomigrateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for automigrate operations.
pub type AutomigrateResult<T> = Result<T, AutomigrateError>;

impl From<std::io::Error> for AutomigrateError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            std::io::ErrorKind::AlreadyExists => ErrorKind::FileAlreadyExists,
            _ => ErrorKind::IOError,
        };
        AutomigrateError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for AutomigrateError {
    fn from(err: serde_json::Error) -> Self {
        AutomigrateError::new(
            &format!("JSON encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<std::string::FromUtf8Error> for AutomigrateError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        AutomigrateError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<std::fmt::Error> for AutomigrateError {
    fn from(err: std::fmt::Error) -> Self {
        AutomigrateError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for AutomigrateError {
    fn from(msg: String) -> Self {
        AutomigrateError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for AutomigrateError {
    fn from(msg: &str) -> Self {
        AutomigrateError::new(msg, ErrorKind::InternalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_new_creates_error() {
        let error = AutomigrateError::new("store unavailable", ErrorKind::StoreError);
        assert_eq!(error.message(), "store unavailable");
        assert_eq!(error.kind(), &ErrorKind::StoreError);
        assert!(error.cause().is_none());
    }

    #[test]
    fn error_new_with_cause_keeps_chain() {
        let cause = AutomigrateError::new("disk full", ErrorKind::IOError);
        let error = AutomigrateError::new_with_cause(
            "failed to save migration file",
            ErrorKind::IOError,
            cause,
        );
        assert_eq!(error.cause().map(|c| c.message()), Some("disk full"));
        assert!(error.source().is_some());
        assert_eq!(error.to_string(), "failed to save migration file: disk full");
    }

    #[test]
    fn is_not_found_matches_kind() {
        assert!(AutomigrateError::new("missing", ErrorKind::NotFound).is_not_found());
        assert!(!AutomigrateError::new("broken", ErrorKind::StoreError).is_not_found());
    }

    #[test]
    fn io_errors_map_to_kinds() {
        let err: AutomigrateError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind(), &ErrorKind::PermissionDenied);

        let err: AutomigrateError =
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists").into();
        assert_eq!(err.kind(), &ErrorKind::FileAlreadyExists);

        let err: AutomigrateError = std::io::Error::other("boom").into();
        assert_eq!(err.kind(), &ErrorKind::IOError);
    }

    #[test]
    fn json_errors_map_to_encoding() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AutomigrateError = json_err.into();
        assert_eq!(err.kind(), &ErrorKind::EncodingError);
    }

    #[test]
    fn question_mark_converts_strings() {
        fn fails() -> AutomigrateResult<()> {
            Err::<(), &str>("plain failure")?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InternalError);
        assert_eq!(err.message(), "plain failure");
    }
}
