//! Markdown lesson parsing.
//!
//! Turns the raw text of a lesson file into front matter, a preamble, and a
//! tree of sections holding prose, code samples, lists and quotes. Parsing
//! never fails: malformed markup degrades to a best-effort structure and is
//! reported through [`Diagnostic`]s instead.

mod blocks;
mod front_matter;
pub mod inline;
pub mod slug;

use tracing::{debug, instrument};

use docweave_shared::{Block, FrontMatter, Section};

use blocks::Event;

pub use inline::{escape_html, plain_text, render_html};
pub use slug::{AnchorSet, slugify};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of parsing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub front_matter: Option<FrontMatter>,
    /// Blocks before the first heading.
    pub preamble: Vec<Block>,
    /// Root sections in source order.
    pub sections: Vec<Section>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A non-fatal observation about malformed or ambiguous markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line in the original text.
    pub line: usize,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A heading skipped a level while a shallower section was open; it was
    /// promoted to the document root.
    SkippedLevel { level: u8, open_level: u8 },
    /// A code fence was never closed and consumed the rest of the document.
    UnterminatedFence,
    /// Two headings slugged to the same anchor; the later one got a suffix.
    DuplicateAnchor { anchor: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            DiagnosticKind::SkippedLevel { level, open_level } => write!(
                f,
                "line {}: level-{level} heading under a level-{open_level} section, promoted to root",
                self.line
            ),
            DiagnosticKind::UnterminatedFence => {
                write!(f, "line {}: code fence is never closed", self.line)
            }
            DiagnosticKind::DuplicateAnchor { anchor } => {
                write!(f, "line {}: duplicate heading anchor, renamed to `{anchor}`", self.line)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse raw lesson text into a section tree.
///
/// This is the main entry point. It:
/// 1. Normalizes line endings
/// 2. Splits off `---` front matter
/// 3. Scans the body into headings and blocks
/// 4. Nests sections by heading level
#[instrument(skip_all, fields(len = raw.len()))]
pub fn parse(raw: &str) -> ParsedDocument {
    let normalized = raw.replace("\r\n", "\n");
    let (front_matter, body) = front_matter::split(&normalized);

    let first_line = 1 + normalized[..normalized.len() - body.len()].matches('\n').count();
    let events = blocks::scan(body, first_line);

    let parsed = build_tree(front_matter, events);
    debug!(
        sections = parsed.sections.len(),
        preamble_blocks = parsed.preamble.len(),
        diagnostics = parsed.diagnostics.len(),
        "parse complete"
    );
    parsed
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

/// Arena node used while nesting; converted to an owned [`Section`] at the end.
struct Node {
    level: u8,
    title: String,
    anchor: String,
    blocks: Vec<Block>,
    children: Vec<usize>,
}

/// Nest headings: a level-L heading becomes a child of the open level-(L−1)
/// section; without one it is promoted to the root. A promoted heading closes
/// every section opened before it, so later headings never nest above it and
/// a pre-order walk stays in source order.
fn build_tree(front_matter: Option<FrontMatter>, events: Vec<Event>) -> ParsedDocument {
    let mut nodes: Vec<Node> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut preamble: Vec<Block> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut anchors = AnchorSet::new();

    for event in events {
        match event {
            Event::Heading { level, title, line } => {
                while open.last().is_some_and(|&top| nodes[top].level >= level) {
                    open.pop();
                }

                let (anchor, renamed) = anchors.allocate(&title);
                if renamed {
                    diagnostics.push(Diagnostic {
                        line,
                        kind: DiagnosticKind::DuplicateAnchor {
                            anchor: anchor.clone(),
                        },
                    });
                }

                let idx = nodes.len();
                nodes.push(Node {
                    level,
                    title,
                    anchor,
                    blocks: Vec::new(),
                    children: Vec::new(),
                });

                match open.last().copied() {
                    Some(parent) if nodes[parent].level + 1 == level => {
                        nodes[parent].children.push(idx);
                    }
                    Some(parent) => {
                        diagnostics.push(Diagnostic {
                            line,
                            kind: DiagnosticKind::SkippedLevel {
                                level,
                                open_level: nodes[parent].level,
                            },
                        });
                        open.clear();
                        roots.push(idx);
                    }
                    None => roots.push(idx),
                }
                open.push(idx);
            }
            Event::Block(block) => match nodes.last_mut() {
                Some(current) => current.blocks.push(block),
                None => preamble.push(block),
            },
            Event::UnterminatedFence { line } => diagnostics.push(Diagnostic {
                line,
                kind: DiagnosticKind::UnterminatedFence,
            }),
        }
    }

    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    let sections = roots
        .into_iter()
        .filter_map(|idx| take_section(&mut slots, idx))
        .collect();

    ParsedDocument {
        front_matter,
        preamble,
        sections,
        diagnostics,
    }
}

fn take_section(slots: &mut [Option<Node>], idx: usize) -> Option<Section> {
    let node = slots.get_mut(idx)?.take()?;
    let children = node
        .children
        .into_iter()
        .filter_map(|child| take_section(slots, child))
        .collect();

    Some(Section {
        level: node.level,
        title: node.title,
        anchor: node.anchor,
        blocks: node.blocks,
        children,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_shared::SectionWalk;

    fn titles_with_depth(parsed: &ParsedDocument) -> Vec<(usize, String)> {
        SectionWalk::new(&parsed.sections)
            .map(|(d, s)| (d, s.title.clone()))
            .collect()
    }

    #[test]
    fn title_sub_scenario() {
        let raw = "# Title\n\nSome text\n\n## Sub\n\n```js\nconsole.log(1)\n```";
        let parsed = parse(raw);

        assert!(parsed.preamble.is_empty());
        assert_eq!(parsed.sections.len(), 1);
        let title = &parsed.sections[0];
        assert_eq!(title.title, "Title");
        assert_eq!(title.level, 1);
        assert_eq!(title.children.len(), 1);

        let sub = &title.children[0];
        assert_eq!(sub.title, "Sub");
        assert!(sub.children.is_empty());

        assert_eq!(title.blocks, vec![Block::prose("Some text")]);
        assert_eq!(sub.blocks, vec![Block::code(Some("js"), "console.log(1)")]);
        assert_eq!(
            title.blocks_in_order(),
            vec![
                &Block::prose("Some text"),
                &Block::code(Some("js"), "console.log(1)")
            ]
        );
    }

    #[test]
    fn empty_input_has_no_sections() {
        let parsed = parse("");
        assert!(parsed.sections.is_empty());
        assert!(parsed.preamble.is_empty());
        assert!(parsed.front_matter.is_none());
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn parsing_is_deterministic() {
        let raw = "---\ntitle: Objects\n---\nIntro\n\n# Objects\n## Keys\n### Computed\n## Values\n- a\n- b\n";
        assert_eq!(parse(raw), parse(raw));
    }

    #[test]
    fn section_count_and_depth_follow_heading_levels() {
        let raw = "## A\n### B\n#### C\n### D\n## E\n### F\n";
        let parsed = parse(raw);
        let walked = titles_with_depth(&parsed);

        assert_eq!(walked.len(), 6);
        let min_level = 2;
        for (depth, section) in SectionWalk::new(&parsed.sections) {
            assert_eq!(depth, (section.level - min_level) as usize, "{}", section.title);
        }
    }

    #[test]
    fn skipped_level_is_promoted_to_root() {
        let parsed = parse("# A\n### C\n#### D\n## B\n");
        let walked = titles_with_depth(&parsed);
        assert_eq!(
            walked,
            vec![
                (0, "A".to_string()),
                (0, "C".to_string()),
                (1, "D".to_string()),
                (0, "B".to_string()),
            ]
        );
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic {
                line: 2,
                kind: DiagnosticKind::SkippedLevel {
                    level: 3,
                    open_level: 1
                },
            }]
        );
    }

    #[test]
    fn promoted_section_keeps_later_content_after_it() {
        let parsed = parse("# A\n### C\ntext-c\n## B\ntext-b\n");
        let blocks: Vec<&Block> = SectionWalk::new(&parsed.sections)
            .flat_map(|(_, s)| s.blocks.iter())
            .collect();
        assert_eq!(blocks, vec![&Block::prose("text-c"), &Block::prose("text-b")]);
        assert_eq!(parsed.sections.len(), 3);
        assert_eq!(parsed.sections[2].title, "B");
    }

    #[test]
    fn leading_rule_pair_around_content_keeps_the_heading() {
        let parsed = parse("---\n# Title\nSome text\n---\nMore\n");
        assert!(parsed.front_matter.is_none());
        assert_eq!(parsed.sections[0].title, "Title");
        assert_eq!(parsed.sections[0].level, 1);
    }

    #[test]
    fn code_sample_inside_list_item_stays_in_the_list() {
        let parsed = parse("# L\n- step\n\n  ```js\n  let x = 1;\n  ```\n");
        assert_eq!(
            parsed.sections[0].blocks,
            vec![Block::List(docweave_shared::List {
                ordered: false,
                start: 1,
                items: vec![vec![
                    Block::prose("step"),
                    Block::code(Some("js"), "let x = 1;"),
                ]],
            })]
        );
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn deeper_first_heading_is_a_root() {
        let parsed = parse("### Deep\n# Top\n");
        assert_eq!(parsed.sections.len(), 2);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn preamble_collects_text_before_first_heading() {
        let parsed = parse("Welcome.\n\n- one\n\n# First\nBody\n");
        assert_eq!(parsed.preamble.len(), 2);
        assert_eq!(parsed.sections[0].blocks, vec![Block::prose("Body")]);
    }

    #[test]
    fn front_matter_is_split_and_lines_stay_accurate() {
        let raw = "---\ntitle: Dates\n---\n# Dates\n```\nnever closed\n";
        let parsed = parse(raw);
        assert_eq!(parsed.front_matter.unwrap().title(), Some("Dates"));
        assert_eq!(parsed.sections[0].title, "Dates");
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic {
                line: 5,
                kind: DiagnosticKind::UnterminatedFence,
            }]
        );
    }

    #[test]
    fn duplicate_titles_get_unique_anchors() {
        let parsed = parse("# Example\n## Example\n## Example\n");
        let anchors: Vec<&str> = SectionWalk::new(&parsed.sections)
            .map(|(_, s)| s.anchor.as_str())
            .collect();
        assert_eq!(anchors, vec!["example", "example-1", "example-2"]);
        assert_eq!(parsed.diagnostics.len(), 2);
    }

    #[test]
    fn crlf_input_matches_lf_input() {
        let lf = "# A\n\ntext\n\n```js\nx\n```\n";
        assert_eq!(parse(&lf.replace('\n', "\r\n")), parse(lf));
    }

    #[test]
    fn headings_inside_code_are_not_sections() {
        let parsed = parse("# Real\n```md\n# Fake\n```\n");
        assert_eq!(parsed.sections.len(), 1);
        assert!(parsed.sections[0].children.is_empty());
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic {
            line: 7,
            kind: DiagnosticKind::UnterminatedFence,
        };
        assert_eq!(d.to_string(), "line 7: code fence is never closed");
    }
}
