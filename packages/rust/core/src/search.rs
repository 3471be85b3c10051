//! Client-side search index (`search.json`).

use serde::Serialize;

use docweave_markdown::plain_text;
use docweave_shared::{Block, Document, NavigationIndex, Section};

/// One searchable unit: a document preamble or a single section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchEntry {
    pub doc_id: String,
    /// Title of the owning document.
    pub document: String,
    /// Section title, or the document title for a preamble entry.
    pub title: String,
    /// Link target relative to the output root.
    pub href: String,
    /// Section prose, list items and quotes; code samples are left out.
    pub text: String,
}

/// Build search entries for every document, in index order.
pub fn build_search_index(
    documents: &[Document],
    index: &NavigationIndex,
    excerpt_chars: usize,
) -> Vec<SearchEntry> {
    let mut entries = Vec::new();

    for doc in documents {
        let Some(nav) = index.get(&doc.id) else {
            continue;
        };

        let preamble = excerpt(&doc.preamble, excerpt_chars);
        if !preamble.is_empty() {
            entries.push(SearchEntry {
                doc_id: doc.id.to_string(),
                document: nav.title.clone(),
                title: nav.title.clone(),
                href: nav.href.clone(),
                text: preamble,
            });
        }

        for (_, section) in doc.walk_sections() {
            entries.push(section_entry(doc, section, &nav.title, &nav.href, excerpt_chars));
        }
    }

    entries
}

fn section_entry(
    doc: &Document,
    section: &Section,
    doc_title: &str,
    href: &str,
    excerpt_chars: usize,
) -> SearchEntry {
    SearchEntry {
        doc_id: doc.id.to_string(),
        document: doc_title.to_string(),
        title: section.title.clone(),
        href: format!("{href}#{}", section.anchor),
        text: excerpt(&section.blocks, excerpt_chars),
    }
}

/// Flatten blocks to whitespace-collapsed plain text, cut at `max_chars`.
fn excerpt(blocks: &[Block], max_chars: usize) -> String {
    let mut words: Vec<String> = Vec::new();
    collect_text(blocks, &mut words);

    let joined = words
        .iter()
        .flat_map(|w| w.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");

    match joined.char_indices().nth(max_chars) {
        Some((cut, _)) => joined[..cut].trim_end().to_string(),
        None => joined,
    }
}

/// Plain text of prose at any nesting depth. Code samples are left out.
fn collect_text(blocks: &[Block], out: &mut Vec<String>) {
    for block in blocks {
        match block {
            Block::Prose(text) => out.push(plain_text(text)),
            Block::Quote(inner) => collect_text(inner, out),
            Block::List(list) => {
                for item in &list.items {
                    collect_text(item, out);
                }
            }
            Block::Code(_) => {}
        }
    }
}
