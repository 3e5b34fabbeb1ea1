//! Canonical form of storage-format markup.
//!
//! Confluence re-serializes page bodies on save: entities come back decoded,
//! empty elements change shape and structured macros gain an `ac:macro-id`.
//! Two bodies are the same page content when their canonical forms match.

use std::borrow::Cow;

use quick_xml::escape::{escape, partial_escape, resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Attributes assigned by the server rather than by the renderer.
const SERVER_ATTRIBUTES: &[&str] = &["ac:macro-id"];

/// Canonical serialization of `markup`, or `None` if it does not parse.
///
/// Text and attribute values are decoded and re-escaped minimally, CDATA is
/// folded into the surrounding text, attributes are sorted and every empty
/// element is written as an open/close pair.
pub(crate) fn canonical(markup: &str) -> Option<String> {
    let mut reader = Reader::from_str(markup.trim());
    reader.config_mut().trim_text(false);

    let mut out = String::with_capacity(markup.len());
    let mut text = String::new();
    loop {
        match reader.read_event().ok()? {
            Event::Text(t) => text.push_str(&decode(&String::from_utf8_lossy(&t))),
            Event::GeneralRef(r) => {
                text.push_str(&decode(&format!("&{};", String::from_utf8_lossy(&r))));
            }
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::Start(e) => {
                flush_text(&mut out, &mut text);
                open_tag(&mut out, &e)?;
            }
            Event::Empty(e) => {
                flush_text(&mut out, &mut text);
                open_tag(&mut out, &e)?;
                close_tag(&mut out, e.name().as_ref());
            }
            Event::End(e) => {
                flush_text(&mut out, &mut text);
                close_tag(&mut out, e.name().as_ref());
            }
            Event::Eof => break,
            _ => {}
        }
    }
    flush_text(&mut out, &mut text);
    Some(out)
}

/// Resolve character and entity references, keeping unknown ones verbatim.
fn decode(raw: &str) -> Cow<'_, str> {
    unescape_with(raw, |entity| {
        resolve_predefined_entity(entity).or_else(|| html_entity(entity))
    })
    .unwrap_or(Cow::Borrowed(raw))
}

/// HTML entities the editor writes into stored bodies.
fn html_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "nbsp" => "\u{a0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        _ => return None,
    })
}

fn flush_text(out: &mut String, text: &mut String) {
    if text.is_empty() {
        return;
    }
    let unified = text.replace("\r\n", "\n");
    out.push_str(&partial_escape(unified.as_str()));
    text.clear();
}

fn open_tag(out: &mut String, start: &BytesStart<'_>) -> Option<()> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.ok()?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if SERVER_ATTRIBUTES.contains(&key.as_str()) {
            continue;
        }
        let value = decode(&String::from_utf8_lossy(&attr.value)).into_owned();
        attributes.push((key, value));
    }
    attributes.sort();

    out.push('<');
    out.push_str(&String::from_utf8_lossy(start.name().as_ref()));
    for (key, value) in &attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    out.push('>');
    Some(())
}

fn close_tag(out: &mut String, name: &[u8]) {
    out.push_str("</");
    out.push_str(&String::from_utf8_lossy(name));
    out.push('>');
}
