//! Error types for pdfmark processing.
//!
//! The variants mirror the PostScript error names a pdfmark operator reports
//! (`rangecheck`, `typecheck`, `limitcheck`, ...), plus the write-time and
//! configuration failures of the surrounding document writer.

/// Result type alias for pdfmark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while processing marks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or mismatched parameter shape
    #[error("rangecheck: {0}")]
    RangeCheck(String),

    /// Named object has the wrong kind for the requested operation
    #[error("typecheck: {0}")]
    TypeCheck(String),

    /// Value exceeds a fixed maximum size
    #[error("limitcheck: {0}")]
    LimitCheck(String),

    /// Allocation failure in the object graph
    #[error("VMerror: {0}")]
    OutOfMemory(String),

    /// Required key missing where no default applies
    #[error("undefined: {0}")]
    Undefined(String),

    /// Outline nesting deeper than the supported maximum
    #[error("Outline nesting exceeds maximum depth of {0}")]
    OutlineDepth(usize),

    /// Annotation rejected under the abort compliance policy
    #[error("Compliance violation: {0}")]
    Compliance(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error invalidates the whole document rather than a single mark.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Compliance(_) | Error::OutlineDepth(_))
    }

    pub(crate) fn range(msg: impl Into<String>) -> Self {
        Error::RangeCheck(msg.into())
    }

    pub(crate) fn type_check(msg: impl Into<String>) -> Self {
        Error::TypeCheck(msg.into())
    }

    pub(crate) fn limit(msg: impl Into<String>) -> Self {
        Error::LimitCheck(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rangecheck_message() {
        let err = Error::range("odd number of pdfmark parameters");
        let msg = format!("{}", err);
        assert!(msg.starts_with("rangecheck"));
        assert!(msg.contains("odd number"));
    }

    #[test]
    fn test_limitcheck_message() {
        let err = Error::limit("rectangle string too long");
        assert_eq!(format!("{}", err), "limitcheck: rectangle string too long");
    }

    #[test]
    fn test_outline_depth_message() {
        let err = Error::OutlineDepth(32);
        assert!(format!("{}", err).contains("32"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::OutlineDepth(32).is_fatal());
        assert!(Error::Compliance("non-printing annotation".into()).is_fatal());
        assert!(!Error::range("bad").is_fatal());
        assert!(!Error::type_check("bad").is_fatal());
        assert!(!Error::Undefined("Dest".into()).is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
