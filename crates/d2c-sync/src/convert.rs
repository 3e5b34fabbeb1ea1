//! Markdown conversion capability.

use crate::error::ConversionError;
use crate::tree::DocumentNode;

/// Converts markdown to Confluence storage format.
///
/// Implementations must be pure: identical input yields identical markup.
/// Any `Fn(&str) -> Result<String, ConversionError>` is a converter.
pub trait Converter: Send + Sync {
    /// Convert one document body.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] with the converter's diagnostic if the
    /// document cannot be represented in storage format.
    fn convert(&self, markdown: &str) -> Result<String, ConversionError>;
}

impl<F> Converter for F
where
    F: Fn(&str) -> Result<String, ConversionError> + Send + Sync,
{
    fn convert(&self, markdown: &str) -> Result<String, ConversionError> {
        self(markdown)
    }
}

/// Convert a node's content; containers convert to empty markup.
pub(crate) fn convert_node<C: Converter + ?Sized>(
    converter: &C,
    node: &DocumentNode,
) -> Result<String, ConversionError> {
    match &node.raw_content {
        Some(markdown) => converter.convert(markdown),
        None => Ok(String::new()),
    }
}
