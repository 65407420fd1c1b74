use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for seedbed operations.
///
/// Each kind describes a category of failure so callers can react to the
/// class of a problem without parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use seedbed::errors::{SeedbedError, ErrorKind, SeedbedResult};
///
/// fn example() -> SeedbedResult<()> {
///     Err(SeedbedError::new("cannot $require without a source file", ErrorKind::ConfigurationError))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// A required option is missing or invalid, e.g. `$require` without a
    /// source file context, or a payload file with an unsupported extension
    ConfigurationError,
    /// Directive expansion failure: unknown `$extend` target, malformed
    /// `$eval` expression, invalid `$set` path, unreadable required file
    ResolutionError,
    /// Enumeration, fetch, insert or drop failure from the underlying store
    StoreError,
    /// A value could not be converted between its portable and native form
    CodecError,
    /// A payload file or document tree could not be parsed or serialized
    FormatError,

    // IO errors - mapped from std::io in the From impl below
    /// Generic IO error
    IOError,
    /// The file was not found
    FileNotFound,
    /// Permission denied for file operation
    PermissionDenied,

    /// The provided document identifier is invalid
    InvalidId,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ConfigurationError => write!(f, "Configuration error"),
            ErrorKind::ResolutionError => write!(f, "Resolution error"),
            ErrorKind::StoreError => write!(f, "Store error"),
            ErrorKind::CodecError => write!(f, "Codec error"),
            ErrorKind::FormatError => write!(f, "Format error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom seedbed error type.
///
/// `SeedbedError` carries a message, an [ErrorKind] and an optional cause.
/// Errors can be chained to preserve the underlying failure, and every
/// error captures a backtrace for debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use seedbed::errors::{SeedbedError, ErrorKind};
///
/// let err = SeedbedError::new("unknown extension '$person'", ErrorKind::ResolutionError);
///
/// let cause = SeedbedError::new("IO failed", ErrorKind::IOError);
/// let err = SeedbedError::new_with_cause("cannot read required file", ErrorKind::ResolutionError, cause);
/// ```
#[derive(Clone)]
pub struct SeedbedError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<SeedbedError>>,
    backtrace: Atomic<Backtrace>,
}

impl SeedbedError {
    /// Creates a new `SeedbedError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        SeedbedError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `SeedbedError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for
    /// debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: SeedbedError) -> Self {
        SeedbedError {
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

    pub fn cause(&self) -> Option<&SeedbedError> {
        self.cause.as_deref()
    }
}

impl Display for SeedbedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for SeedbedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for SeedbedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for seedbed operations.
///
/// `SeedbedResult<T>` is shorthand for `Result<T, SeedbedError>`. All
/// fallible seedbed operations return this type.
pub type SeedbedResult<T> = Result<T, SeedbedError>;

// From trait implementations for automatic error conversion
impl From<std::io::Error> for SeedbedError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IOError,
        };
        SeedbedError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for SeedbedError {
    fn from(err: serde_json::Error) -> Self {
        SeedbedError::new(&format!("JSON error: {}", err), ErrorKind::FormatError)
    }
}

impl From<serde_yaml_ng::Error> for SeedbedError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        SeedbedError::new(&format!("YAML error: {}", err), ErrorKind::FormatError)
    }
}

impl From<std::num::ParseIntError> for SeedbedError {
    fn from(err: std::num::ParseIntError) -> Self {
        SeedbedError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::FormatError,
        )
    }
}

impl From<std::num::ParseFloatError> for SeedbedError {
    fn from(err: std::num::ParseFloatError) -> Self {
        SeedbedError::new(
            &format!("Float parsing error: {}", err),
            ErrorKind::FormatError,
        )
    }
}

impl From<String> for SeedbedError {
    fn from(msg: String) -> Self {
        SeedbedError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for SeedbedError {
    fn from(msg: &str) -> Self {
        SeedbedError::new(msg, ErrorKind::InternalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seedbed_error_new_creates_error() {
        let error = SeedbedError::new("An error occurred", ErrorKind::IOError);
        assert_eq!(error.message(), "An error occurred");
        assert_eq!(error.kind(), &ErrorKind::IOError);
        assert!(error.cause().is_none());
    }

    #[test]
    fn seedbed_error_new_with_cause_creates_error() {
        let cause = SeedbedError::new("disk failed", ErrorKind::IOError);
        let error =
            SeedbedError::new_with_cause("cannot read file", ErrorKind::ResolutionError, cause);
        assert_eq!(error.message(), "cannot read file");
        assert_eq!(error.kind(), &ErrorKind::ResolutionError);
        assert!(error.cause().is_some());
    }

    #[test]
    fn seedbed_error_display_formats_correctly() {
        let error = SeedbedError::new("An error occurred", ErrorKind::StoreError);
        assert_eq!(format!("{}", error), "An error occurred");
    }

    #[test]
    fn seedbed_error_debug_formats_with_cause() {
        let cause = SeedbedError::new("root cause", ErrorKind::IOError);
        let error = SeedbedError::new_with_cause("outer", ErrorKind::StoreError, cause);
        let formatted = format!("{:?}", error);
        assert!(formatted.contains("outer"));
        assert!(formatted.contains("Caused by:"));
    }

    #[test]
    fn seedbed_error_source_returns_cause() {
        let cause = SeedbedError::new("root cause", ErrorKind::IOError);
        let error = SeedbedError::new_with_cause("outer", ErrorKind::StoreError, cause);
        assert!(error.source().is_some());

        let error = SeedbedError::new("no cause", ErrorKind::StoreError);
        assert!(error.source().is_none());
    }

    #[test]
    fn test_error_kind_taxonomy() {
        let config = SeedbedError::new("missing file context", ErrorKind::ConfigurationError);
        assert_eq!(config.kind(), &ErrorKind::ConfigurationError);

        let resolution = SeedbedError::new("bad $set path", ErrorKind::ResolutionError);
        assert_eq!(resolution.kind(), &ErrorKind::ResolutionError);

        let store = SeedbedError::new("insert failed", ErrorKind::StoreError);
        assert_eq!(store.kind(), &ErrorKind::StoreError);

        let codec = SeedbedError::new("bad $oid hex", ErrorKind::CodecError);
        assert_eq!(codec.kind(), &ErrorKind::CodecError);
    }

    #[test]
    fn test_from_io_error_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SeedbedError = io_err.into();
        assert_eq!(err.kind(), &ErrorKind::FileNotFound);
        assert!(err.message().contains("IO error"));
    }

    #[test]
    fn test_from_io_error_permission_denied() {
        let io_err =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: SeedbedError = io_err.into();
        assert_eq!(err.kind(), &ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_from_io_error_other() {
        let io_err = std::io::Error::other("unknown io error");
        let err: SeedbedError = io_err.into();
        assert_eq!(err.kind(), &ErrorKind::IOError);
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SeedbedError = json_err.into();
        assert_eq!(err.kind(), &ErrorKind::FormatError);
    }

    #[test]
    fn test_from_string_and_str() {
        let err: SeedbedError = String::from("string error").into();
        assert_eq!(err.kind(), &ErrorKind::InternalError);
        assert_eq!(err.message(), "string error");

        let err: SeedbedError = "str error".into();
        assert_eq!(err.kind(), &ErrorKind::InternalError);
    }

    #[test]
    fn test_question_mark_operator_with_from() {
        fn parse_number_operation() -> SeedbedResult<i64> {
            let num: i64 = "12345".parse()?;
            Ok(num)
        }

        assert_eq!(parse_number_operation().unwrap(), 12345);

        fn failing_parse() -> SeedbedResult<i64> {
            let num: i64 = "not_a_number".parse()?;
            Ok(num)
        }

        let result = failing_parse();
        assert!(result.is_err());
        if let Err(err) = result {
            assert_eq!(err.kind(), &ErrorKind::FormatError);
        }
    }

    #[test]
    fn test_error_chain_with_different_kinds() {
        let root_cause = SeedbedError::new("File not found", ErrorKind::FileNotFound);
        let mid_level =
            SeedbedError::new_with_cause("Failed to read payload", ErrorKind::IOError, root_cause);
        let top_level = SeedbedError::new_with_cause(
            "Cannot resolve $require",
            ErrorKind::ResolutionError,
            mid_level,
        );

        assert_eq!(top_level.kind(), &ErrorKind::ResolutionError);
        if let Some(cause) = top_level.cause() {
            assert_eq!(cause.kind(), &ErrorKind::IOError);
        }
    }
}
