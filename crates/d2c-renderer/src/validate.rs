//! Well-formedness check for rendered storage format.
//!
//! Confluence parses page bodies as XHTML and rejects anything that is not
//! well-formed XML. Raw HTML in markdown passes through the renderer
//! untouched, so it is the usual source of unclosed or mismatched elements.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::RenderError;

const ROOT_OPEN: &str = "<root>";

/// Check that `markup` is a well-formed XML fragment.
///
/// # Errors
///
/// Returns [`RenderError::Malformed`] with the line of the first problem.
pub fn check_well_formed(markup: &str) -> Result<(), RenderError> {
    let wrapped = format!("{ROOT_OPEN}{markup}</root>");
    let mut reader = Reader::from_str(&wrapped);
    reader.config_mut().trim_text(false);

    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                if depth == 0 {
                    return Err(malformed(
                        markup,
                        position(reader.buffer_position()),
                        "unexpected closing tag",
                    ));
                }
                depth -= 1;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(malformed(
                    markup,
                    position(reader.error_position()),
                    &e.to_string(),
                ));
            }
        }
    }

    if depth == 0 {
        Ok(())
    } else {
        Err(malformed(markup, wrapped.len(), "unclosed element"))
    }
}

fn position<P>(pos: P) -> usize
where
    usize: TryFrom<P>,
{
    usize::try_from(pos).unwrap_or(usize::MAX)
}

/// Build an error for a byte offset into the wrapped document.
fn malformed(markup: &str, offset: usize, message: &str) -> RenderError {
    let offset = offset.saturating_sub(ROOT_OPEN.len()).min(markup.len());
    let prefix = markup.get(..offset).unwrap_or(markup);
    RenderError::Malformed {
        line: prefix.matches('\n').count() + 1,
        message: message.to_owned(),
    }
}
