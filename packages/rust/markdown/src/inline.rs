//! Inline markup: code spans, emphasis, links and images.
//!
//! Prose blocks keep their inline source, so they are parsed again here:
//! to HTML for page bodies, and to plain text for search excerpts.

use pulldown_cmark::{Event, Parser, Tag, TagEnd, html};

use crate::blocks::markdown_options;

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render inline markup to HTML without a wrapping `<p>`. Every link and
/// image target is passed through `resolve_link` before being written out.
pub fn render_html<F>(text: &str, resolve_link: &F) -> String
where
    F: Fn(&str) -> String,
{
    let events = Parser::new_ext(text, markdown_options())
        .filter(|event| {
            !matches!(
                event,
                Event::Start(Tag::Paragraph) | Event::End(TagEnd::Paragraph)
            )
        })
        .map(|event| match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: resolve_link(&dest_url).into(),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Image {
                link_type,
                dest_url: resolve_link(&dest_url).into(),
                title,
                id,
            }),
            other => other,
        });

    let mut out = String::with_capacity(text.len() + 16);
    html::push_html(&mut out, events);
    out.truncate(out.trim_end().len());
    out
}

/// Strip inline markup, keeping the visible text.
pub fn plain_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for event in Parser::new_ext(text, markdown_options()) {
        match event {
            Event::Text(t) | Event::Code(t) => out.push_str(&t),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            _ => {}
        }
    }
    out
}
