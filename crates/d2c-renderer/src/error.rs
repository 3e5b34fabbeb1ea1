//! Error types for storage format rendering.

use d2c_sync::ConversionError;

/// Rendering produced markup that Confluence would reject.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// Output is not well-formed XML, usually because of raw HTML in the source.
    #[error("malformed markup at line {line}: {message}")]
    Malformed {
        /// 1-based line in the rendered markup.
        line: usize,
        /// Parser diagnostic.
        message: String,
    },
}

impl From<RenderError> for ConversionError {
    fn from(err: RenderError) -> Self {
        ConversionError::new(err.to_string())
    }
}
