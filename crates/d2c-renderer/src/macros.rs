//! Confluence storage format fragments.
//!
//! Produces:
//! - `ac:structured-macro` code blocks with a CDATA body
//! - Panel macros (`info`, `tip`, `note`, `warning`) for blockquotes
//! - `ac:image` with `ri:url` or `ri:attachment`
//! - The `toc` macro

use std::fmt::Write;

use pulldown_cmark::BlockQuoteKind;

use crate::state::escape_html;

/// Panel macro used for a blockquote.
///
/// Plain blockquotes and `[!NOTE]` alerts become info panels.
pub(crate) fn panel_name(kind: Option<BlockQuoteKind>) -> &'static str {
    match kind {
        None | Some(BlockQuoteKind::Note) => "info",
        Some(BlockQuoteKind::Tip) => "tip",
        Some(BlockQuoteKind::Important) => "note",
        Some(BlockQuoteKind::Warning | BlockQuoteKind::Caution) => "warning",
    }
}

pub(crate) fn panel_start(kind: Option<BlockQuoteKind>, out: &mut String) {
    let _ = write!(
        out,
        r#"<ac:structured-macro ac:name="{}" ac:schema-version="1"><ac:rich-text-body>"#,
        panel_name(kind)
    );
}

pub(crate) fn panel_end(out: &mut String) {
    out.push_str("</ac:rich-text-body></ac:structured-macro>");
}

pub(crate) fn code_block(lang: Option<&str>, content: &str, out: &mut String) {
    out.push_str(r#"<ac:structured-macro ac:name="code" ac:schema-version="1">"#);
    if let Some(lang) = lang {
        let _ = write!(
            out,
            r#"<ac:parameter ac:name="language">{}</ac:parameter>"#,
            escape_html(lang)
        );
    }
    let _ = write!(
        out,
        r"<ac:plain-text-body><![CDATA[{}]]></ac:plain-text-body>",
        escape_cdata(content)
    );
    out.push_str("</ac:structured-macro>");
}

/// Split `]]>` across two CDATA sections.
fn escape_cdata(content: &str) -> String {
    content.replace("]]>", "]]]]><![CDATA[>")
}

pub(crate) fn image(src: &str, alt: &str, out: &mut String) {
    let is_external = src.starts_with("http://") || src.starts_with("https://");
    let resource = if is_external {
        format!(r#"<ri:url ri:value="{}" />"#, escape_html(src))
    } else {
        // Relative images are expected as attachments of the page
        let filename = src.rsplit('/').next().unwrap_or(src);
        format!(r#"<ri:attachment ri:filename="{}" />"#, escape_html(filename))
    };
    if alt.is_empty() {
        let _ = write!(out, "<ac:image>{resource}</ac:image>");
    } else {
        let _ = write!(
            out,
            r#"<ac:image ac:alt="{}">{resource}</ac:image>"#,
            escape_html(alt)
        );
    }
}

pub(crate) fn toc(out: &mut String) {
    out.push_str(r#"<ac:structured-macro ac:name="toc" ac:schema-version="1" />"#);
}
