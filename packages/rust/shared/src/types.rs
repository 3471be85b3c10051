//! Core domain types for docweave: documents, their section trees, and the
//! navigation index shared by every rendered page.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};

/// Current schema version for the `manifest.json` / `toc.json` formats.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Bytes escaped inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

// ---------------------------------------------------------------------------
// DocId
// ---------------------------------------------------------------------------

/// Identifier of a document: its path relative to the input root, extension
/// stripped, separators normalized to `/` (e.g. `objects/arrays`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an identifier from a path relative to the content root.
    ///
    /// Returns `None` for paths that escape the root or have no file stem.
    pub fn from_relative_path(rel: &Path) -> Option<Self> {
        let mut segments: Vec<String> = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return None,
            }
        }

        let last = segments.pop()?;
        let stem = Path::new(&last).file_stem()?.to_string_lossy().into_owned();
        segments.push(stem);
        Some(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Output path of the rendered page, relative to the output root.
    pub fn html_path(&self) -> String {
        format!("{}.html", self.0)
    }

    /// URL of the rendered page relative to the output root, with each path
    /// segment percent-encoded.
    pub fn href(&self) -> String {
        let encoded: Vec<String> = self
            .0
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect();
        format!("{}.html", encoded.join("/"))
    }

    /// Number of directories between the output root and this page.
    pub fn depth(&self) -> usize {
        self.0.matches('/').count()
    }

    /// Final path segment (`objects/arrays` → `arrays`).
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// A fenced code sample. Never executed; the text is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSample {
    /// Language tag from the fence info string (`js` in ```` ```js ````).
    pub lang: Option<String>,
    /// Literal source text, without the fences and without a trailing newline.
    pub text: String,
}

/// A bulleted or numbered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    /// First number of an ordered list (`1` for bullet lists).
    pub start: u64,
    /// Each item's content, which may itself hold code samples or lists.
    pub items: Vec<Vec<Block>>,
}

/// The smallest unit of content within a section.
///
/// Prose holds the paragraph's inline markup source (emphasis, code spans,
/// links) with container markers removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Prose(String),
    Code(CodeSample),
    List(List),
    Quote(Vec<Block>),
}

impl Block {
    pub fn prose(text: impl Into<String>) -> Self {
        Self::Prose(text.into())
    }

    pub fn code(lang: Option<&str>, text: impl Into<String>) -> Self {
        Self::Code(CodeSample {
            lang: lang.map(str::to_string),
            text: text.into(),
        })
    }

    /// A list whose items are single prose paragraphs.
    pub fn simple_list<I, S>(ordered: bool, start: u64, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(List {
            ordered,
            start,
            items: items.into_iter().map(|i| vec![Self::prose(i)]).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// A heading-delimited subdivision of a document.
///
/// A section's own blocks precede its sub-sections in the source, and a
/// section promoted to the root closes everything opened before it. A
/// pre-order walk with `blocks` before `children` is therefore source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading level, 1 through 6.
    pub level: u8,
    pub title: String,
    /// Fragment id of the rendered heading, unique within the document.
    pub anchor: String,
    pub blocks: Vec<Block>,
    pub children: Vec<Section>,
}

impl Section {
    /// Number of sections in this subtree, including `self`.
    pub fn section_count(&self) -> usize {
        1 + self.children.iter().map(Section::section_count).sum::<usize>()
    }

    /// Blocks of this subtree in document order.
    pub fn blocks_in_order(&self) -> Vec<&Block> {
        let mut out: Vec<&Block> = self.blocks.iter().collect();
        for child in &self.children {
            out.extend(child.blocks_in_order());
        }
        out
    }
}

/// Pre-order walk over a section forest, yielding `(depth, section)`.
pub struct SectionWalk<'a> {
    stack: Vec<(usize, &'a Section)>,
}

impl<'a> SectionWalk<'a> {
    pub fn new(roots: &'a [Section]) -> Self {
        Self {
            stack: roots.iter().rev().map(|s| (0, s)).collect(),
        }
    }
}

impl<'a> Iterator for SectionWalk<'a> {
    type Item = (usize, &'a Section);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, section) = self.stack.pop()?;
        self.stack
            .extend(section.children.iter().rev().map(|c| (depth + 1, c)));
        Some((depth, section))
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// `key: value` pairs from a leading `---` block, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub fields: Vec<(String, String)>,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").filter(|t| !t.is_empty())
    }
}

/// One loaded and parsed lesson file. Immutable for the rest of the run.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub source_path: PathBuf,
    pub raw: String,
    /// SHA-256 (hex) of the raw text.
    pub content_hash: String,
    pub front_matter: Option<FrontMatter>,
    /// Blocks that appear before the first heading.
    pub preamble: Vec<Block>,
    /// Root sections in source order.
    pub sections: Vec<Section>,
}

impl Document {
    pub fn walk_sections(&self) -> SectionWalk<'_> {
        SectionWalk::new(&self.sections)
    }

    pub fn section_count(&self) -> usize {
        self.sections.iter().map(Section::section_count).sum()
    }

    /// Heading titles in document order.
    pub fn heading_titles(&self) -> Vec<&str> {
        self.walk_sections().map(|(_, s)| s.title.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Navigation index
// ---------------------------------------------------------------------------

/// One heading as listed in the navigation index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavHeading {
    pub level: u8,
    /// Nesting depth in the section tree (0 for root sections).
    pub depth: usize,
    pub title: String,
    pub anchor: String,
}

/// Navigation data for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub doc_id: DocId,
    pub title: String,
    /// Rendered page path relative to the output root.
    pub href: String,
    pub headings: Vec<NavHeading>,
}

/// Cross-document table of contents, in loader order.
///
/// Built once after every document is parsed, then shared read-only by all
/// page renders.
#[derive(Debug, Clone, Default)]
pub struct NavigationIndex {
    entries: Vec<NavEntry>,
    positions: HashMap<DocId, usize>,
}

impl NavigationIndex {
    pub fn new(entries: Vec<NavEntry>) -> Self {
        let positions = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.doc_id.clone(), i))
            .collect();
        Self { entries, positions }
    }

    pub fn entries(&self) -> &[NavEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, id: &DocId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn get(&self, id: &DocId) -> Option<&NavEntry> {
        self.position(id).map(|i| &self.entries[i])
    }

    /// Ordered heading titles of a document.
    pub fn titles(&self, id: &DocId) -> Option<Vec<&str>> {
        self.get(id)
            .map(|e| e.headings.iter().map(|h| h.title.as_str()).collect())
    }

    pub fn previous(&self, id: &DocId) -> Option<&NavEntry> {
        let pos = self.position(id)?;
        pos.checked_sub(1).map(|i| &self.entries[i])
    }

    pub fn next(&self, id: &DocId) -> Option<&NavEntry> {
        let pos = self.position(id)?;
        self.entries.get(pos + 1)
    }
}

// ---------------------------------------------------------------------------
// TocEntry
// ---------------------------------------------------------------------------

/// A single entry in the table of contents (`toc.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Display title.
    pub title: String,
    /// Link target relative to the output root (`objects/arrays.html#sorting`).
    pub path: String,
    /// Nested child entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocEntry>,
}

/// Root structure for `toc.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toc {
    pub schema_version: u32,
    pub title: String,
    /// One entry per document, in loader order.
    pub sections: Vec<TocEntry>,
}
