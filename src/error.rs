//! Error types for the glyph-substitution renderer.
//!
//! Font-format errors (malformed embedded font programs) are deliberately
//! absent here: resolution recovers from them locally by falling through
//! to the next substitution strategy, and only logs them.

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while rendering or printing a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document's page tree or resources are malformed
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A font kind this renderer does not handle was encountered.
    /// Only composite CID-TrueType and simple Type 1 fonts are supported;
    /// this error is fatal and never retried.
    #[error("Not yet implemented: font kind {0}")]
    UnsupportedFontKind(String),

    /// Rasterization or image encoding failure
    #[error("Render error: {0}")]
    Render(String),

    /// Print spooler failure
    #[error("Print error: {0}")]
    Print(String),

    /// Document model error from the underlying PDF library
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_font_kind_message() {
        let err = Error::UnsupportedFontKind("Type3".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Not yet implemented"));
        assert!(msg.contains("Type3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pdf");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
