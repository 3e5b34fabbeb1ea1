//! Markdown to Confluence XHTML storage format.
//!
//! [`StorageRenderer`] walks `pulldown-cmark` events and emits storage
//! format markup:
//! - Code blocks become `code` macros with a CDATA body
//! - Blockquotes become `info` panels (GFM alerts pick `tip`, `note` or `warning`)
//! - Images become `ac:image` with `ri:url` or `ri:attachment`
//! - An optional `toc` macro is prepended to documents with headings
//!
//! Output is checked for XML well-formedness before it is returned, so raw
//! HTML that Confluence would reject fails the document instead of the
//! upload. The renderer implements [`d2c_sync::Converter`].
//!
//! # Example
//!
//! ```
//! use d2c_renderer::StorageRenderer;
//!
//! let markup = StorageRenderer::new().render("**Bold** text").unwrap();
//! assert_eq!(markup, "<p><strong>Bold</strong> text</p>");
//! ```

mod error;
mod macros;
mod renderer;
mod state;
mod validate;

pub use error::RenderError;
pub use renderer::StorageRenderer;
pub use state::escape_html;
pub use validate::check_well_formed;
