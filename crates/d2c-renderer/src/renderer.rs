//! Markdown to Confluence storage format renderer.

use std::fmt::Write;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use d2c_sync::{ConversionError, Converter};

use crate::error::RenderError;
use crate::macros;
use crate::state::{CodeBlockState, ImageState, TableState, escape_html};
use crate::validate::check_well_formed;

/// Renders markdown documents to Confluence XHTML storage format.
///
/// Rendering is deterministic: the same markdown and options always produce
/// the same markup, which is what makes unchanged pages compare equal on
/// the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageRenderer {
    gfm: bool,
    prepend_toc: bool,
}

impl Default for StorageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageRenderer {
    /// Create a renderer with GFM enabled and no table of contents.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gfm: true,
            prepend_toc: false,
        }
    }

    /// Enable or disable GitHub Flavored Markdown features.
    ///
    /// When enabled, the parser supports:
    /// - Tables
    /// - Strikethrough (`~~text~~`)
    /// - Task lists (`- [ ] item`)
    /// - Alert blockquotes (`> [!WARNING]`)
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Prepend a `toc` macro to documents that have headings.
    #[must_use]
    pub fn with_toc(mut self, enabled: bool) -> Self {
        self.prepend_toc = enabled;
        self
    }

    fn parser_options(self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Render markdown and check the result is well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Malformed`] if the output is not well-formed
    /// XML, which Confluence would reject.
    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let mut writer = StorageWriter::default();
        for event in Parser::new_ext(markdown, self.parser_options()) {
            writer.process_event(event);
        }

        let body = writer.output;
        check_well_formed(&body)?;

        if self.prepend_toc && writer.has_headings {
            let mut out = String::with_capacity(body.len() + 64);
            macros::toc(&mut out);
            out.push_str(&body);
            Ok(out)
        } else {
            Ok(body)
        }
    }
}

impl Converter for StorageRenderer {
    fn convert(&self, markdown: &str) -> Result<String, ConversionError> {
        Ok(self.render(markdown)?)
    }
}

/// Output buffer and state for one document.
#[derive(Default)]
struct StorageWriter {
    output: String,
    code: CodeBlockState,
    table: TableState,
    image: ImageState,
    has_headings: bool,
}

impl StorageWriter {
    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) if self.image.is_active() => self.image.push_str(&code),
            Event::Code(code) => {
                let _ = write!(self.output, "<code>{}</code>", escape_html(&code));
            }
            Event::Html(html) | Event::InlineHtml(html) => self.output.push_str(&html),
            Event::SoftBreak => self.output.push('\n'),
            Event::HardBreak => self.output.push_str("<br />"),
            Event::Rule => self.output.push_str("<hr />"),
            Event::TaskListMarker(checked) => {
                self.output.push_str(if checked { "[x] " } else { "[ ] " });
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        // Alt text is plain text; inline markup inside it is dropped
        if self.image.is_active() {
            return;
        }
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                self.has_headings = true;
                let _ = write!(self.output, "<h{}>", heading_level(level));
            }
            Tag::BlockQuote(kind) => macros::panel_start(kind, &mut self.output),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code.start(lang);
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>"),
                Some(n) => {
                    let _ = write!(self.output, r#"<ol start="{n}">"#);
                }
                None => self.output.push_str("<ul>"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.output.push_str("<dl>"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.output.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let align = self.table.current_alignment_style();
                let tag = if self.table.is_in_head() { "th" } else { "td" };
                let _ = write!(self.output, "<{tag}{align}>");
            }
            Tag::Emphasis => self.output.push_str("<em>"),
            Tag::Strong => self.output.push_str("<strong>"),
            Tag::Strikethrough => self.output.push_str("<s>"),
            Tag::Superscript => self.output.push_str("<sup>"),
            Tag::Subscript => self.output.push_str("<sub>"),
            Tag::Link { dest_url, .. } => {
                let _ = write!(self.output, r#"<a href="{}">"#, escape_html(&dest_url));
            }
            Tag::Image { dest_url, .. } => self.image.start(dest_url.into_string()),
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        if self.image.is_active() && !matches!(tag, TagEnd::Image) {
            return;
        }
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(level) => {
                let _ = write!(self.output, "</h{}>", heading_level(level));
            }
            TagEnd::BlockQuote(_) => macros::panel_end(&mut self.output),
            TagEnd::CodeBlock => {
                let (lang, content) = self.code.end();
                macros::code_block(lang.as_deref(), &content, &mut self.output);
            }
            TagEnd::List(ordered) => self.output.push_str(if ordered { "</ol>" } else { "</ul>" }),
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
            TagEnd::DefinitionList => self.output.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.output.push_str("</tr></thead><tbody>");
                self.table.end_head();
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output.push_str(if self.table.is_in_head() {
                    "</th>"
                } else {
                    "</td>"
                });
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.output.push_str("</em>"),
            TagEnd::Strong => self.output.push_str("</strong>"),
            TagEnd::Strikethrough => self.output.push_str("</s>"),
            TagEnd::Superscript => self.output.push_str("</sup>"),
            TagEnd::Subscript => self.output.push_str("</sub>"),
            TagEnd::Link => self.output.push_str("</a>"),
            TagEnd::Image => {
                if let Some((src, alt)) = self.image.end() {
                    macros::image(&src, &alt, &mut self.output);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        if self.code.is_active() {
            self.code.push_str(text);
        } else if self.image.is_active() {
            self.image.push_str(text);
        } else {
            self.output.push_str(&escape_html(text));
        }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
