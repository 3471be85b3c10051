//! Navigation index and TOC builder.
//!
//! Turns the parsed document set into the [`NavigationIndex`] shared by
//! every page render, and into the hierarchical [`Toc`] written to
//! `toc.json`. Both are pure functions of their input.

use std::iter::Peekable;

use tracing::{debug, instrument};

use docweave_shared::{
    CURRENT_SCHEMA_VERSION, DocId, Document, NavEntry, NavHeading, NavigationIndex, Toc, TocEntry,
};

/// Build the navigation index, preserving document and heading order.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn build_index(documents: &[Document]) -> NavigationIndex {
    let entries: Vec<NavEntry> = documents
        .iter()
        .map(|doc| NavEntry {
            doc_id: doc.id.clone(),
            title: document_title(doc),
            href: doc.id.href(),
            headings: doc
                .walk_sections()
                .map(|(depth, section)| NavHeading {
                    level: section.level,
                    depth,
                    title: section.title.clone(),
                    anchor: section.anchor.clone(),
                })
                .collect(),
        })
        .collect();

    debug!(
        headings = entries.iter().map(|e| e.headings.len()).sum::<usize>(),
        "navigation index built"
    );
    NavigationIndex::new(entries)
}

/// Display title of a document: front matter `title`, else the first
/// heading, else a title derived from its identifier.
pub fn document_title(doc: &Document) -> String {
    if let Some(title) = doc.front_matter.as_ref().and_then(|fm| fm.title()) {
        return title.to_string();
    }

    doc.walk_sections()
        .map(|(_, s)| s.title.trim())
        .find(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| title_from_id(&doc.id))
}

/// Build the `toc.json` structure: one entry per document, headings nested
/// beneath it by section depth.
pub fn build_toc(index: &NavigationIndex, site_title: &str) -> Toc {
    let sections = index
        .entries()
        .iter()
        .map(|entry| {
            let mut headings = entry.headings.iter().peekable();
            TocEntry {
                title: entry.title.clone(),
                path: entry.href.clone(),
                children: nest_headings(&mut headings, 0, &entry.href),
            }
        })
        .collect();

    Toc {
        schema_version: CURRENT_SCHEMA_VERSION,
        title: site_title.to_string(),
        sections,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Consume a pre-order heading sequence into a tree of TOC entries.
fn nest_headings<'a, I>(headings: &mut Peekable<I>, depth: usize, href: &str) -> Vec<TocEntry>
where
    I: Iterator<Item = &'a NavHeading>,
{
    let mut out = Vec::new();
    while let Some(heading) = headings.next_if(|h| h.depth >= depth) {
        let children = nest_headings(headings, heading.depth + 1, href);
        out.push(TocEntry {
            title: heading.title.clone(),
            path: format!("{href}#{}", heading.anchor),
            children,
        });
    }
    out
}

/// Extract a human-readable title from a document id.
fn title_from_id(id: &DocId) -> String {
    let segment = id.last_segment();

    if segment == "index" {
        return "Overview".to_string();
    }

    segment
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    format!("{upper}{}", chars.collect::<String>())
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_shared::FrontMatter;

    fn make_doc(id: &str, raw: &str) -> Document {
        let parsed = docweave_markdown::parse(raw);
        Document {
            id: DocId::from(id),
            source_path: format!("{id}.md").into(),
            raw: raw.to_string(),
            content_hash: String::new(),
            front_matter: parsed.front_matter,
            preamble: parsed.preamble,
            sections: parsed.sections,
        }
    }

    #[test]
    fn index_preserves_document_and_heading_order() {
        let docs = vec![
            make_doc("zeta", "# Zeta\n## Two\n## One\n"),
            make_doc("alpha", "# Alpha\n"),
        ];
        let index = build_index(&docs);

        let ids: Vec<&str> = index.entries().iter().map(|e| e.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
        assert_eq!(
            index.titles(&DocId::from("zeta")),
            Some(vec!["Zeta", "Two", "One"])
        );
        assert_eq!(index.get(&DocId::from("alpha")).unwrap().href, "alpha.html");
    }

    #[test]
    fn index_records_depth_and_anchor() {
        let docs = vec![make_doc("json", "# JSON\n## JSON.parse()\n### Reviver\n")];
        let index = build_index(&docs);
        let headings = &index.entries()[0].headings;

        assert_eq!(headings[1].anchor, "jsonparse");
        assert_eq!(
            headings.iter().map(|h| h.depth).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn build_index_is_deterministic() {
        let docs = vec![make_doc("a", "# A\n## B\n"), make_doc("c", "text only\n")];
        assert_eq!(
            build_index(&docs).entries(),
            build_index(&docs).entries()
        );
    }

    #[test]
    fn document_title_precedence() {
        let mut doc = make_doc("template-strings", "# Template literals\n");
        assert_eq!(document_title(&doc), "Template literals");

        doc.front_matter = Some(FrontMatter {
            fields: vec![("title".into(), "Template Strings".into())],
        });
        assert_eq!(document_title(&doc), "Template Strings");

        let doc = make_doc("logical_operators", "no headings here\n");
        assert_eq!(document_title(&doc), "Logical Operators");
    }

    #[test]
    fn toc_nests_headings_under_documents() {
        let docs = vec![
            make_doc("objects", "# Objects\n## Keys\n### Computed\n## Values\n"),
            make_doc("guide/index", ""),
        ];
        let toc = build_toc(&build_index(&docs), "Reference");

        assert_eq!(toc.title, "Reference");
        assert_eq!(toc.sections.len(), 2);

        let objects = &toc.sections[0];
        assert_eq!(objects.path, "objects.html");
        assert_eq!(objects.children.len(), 1);
        let root = &objects.children[0];
        assert_eq!(root.path, "objects.html#objects");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].children[0].title, "Computed");

        let guide = &toc.sections[1];
        assert_eq!(guide.title, "Overview");
        assert_eq!(guide.path, "guide/index.html");
        assert!(guide.children.is_empty());
    }

    #[test]
    fn title_from_id_converts_slugs() {
        assert_eq!(title_from_id(&DocId::from("getting-started")), "Getting Started");
        assert_eq!(title_from_id(&DocId::from("arrow_functions")), "Arrow Functions");
        assert_eq!(title_from_id(&DocId::from("index")), "Overview");
        assert_eq!(title_from_id(&DocId::from("basics/control-flow")), "Control Flow");
    }
}
