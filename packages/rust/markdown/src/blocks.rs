//! Block scanner over CommonMark events.
//!
//! Walks the `pulldown_cmark` event stream of a document body and flattens it
//! into headings and blocks in source order. Only top-level headings become
//! section boundaries; a heading inside a list or quote stays in that
//! container as prose.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event as MdEvent, Options, Parser, Tag};

use docweave_shared::{Block, CodeSample, List};

/// One structural element of the body, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Heading { level: u8, title: String, line: usize },
    Block(Block),
    UnterminatedFence { line: usize },
}

/// Extensions enabled for every parse, block-level and inline alike.
pub(crate) fn markdown_options() -> Options {
    Options::ENABLE_STRIKETHROUGH
}

/// Scan `body`, whose first line is line `first_line` of the original text.
pub(crate) fn scan(body: &str, first_line: usize) -> Vec<Event> {
    let mut scanner = Scanner::new(body, first_line);
    for (event, range) in Parser::new_ext(body, markdown_options()).into_offset_iter() {
        scanner.feed(event, range);
    }
    scanner.finish()
}

// ---------------------------------------------------------------------------
// Scanner state
// ---------------------------------------------------------------------------

/// A block container whose content is still being collected.
enum Container {
    Quote(Vec<Block>),
    List(List),
    Item(Vec<Block>),
}

/// Inline markup source of one paragraph (or of a tight list item, which has
/// no paragraph events), rebuilt from event ranges so that container markers
/// on continuation lines are left out.
struct InlineSource {
    text: String,
    last_end: Option<usize>,
    /// Nesting of inline tags (emphasis, links) below the paragraph.
    depth: usize,
    /// Opened by a paragraph or heading start, rather than by loose text.
    explicit: bool,
}

impl InlineSource {
    fn new(explicit: bool) -> Self {
        Self {
            text: String::new(),
            last_end: None,
            depth: 0,
            explicit,
        }
    }

    fn push(&mut self, src: &str, range: Range<usize>) {
        let start = range.start.max(self.last_end.unwrap_or(0));
        if start >= range.end {
            return;
        }
        if let Some(end) = self.last_end {
            // Same-line gaps are markup pulldown folded away, like `\` escapes.
            let gap = &src[end..start];
            if !gap.contains('\n') && !self.text.ends_with('\n') {
                self.text.push_str(gap);
            }
        }
        self.text.push_str(&src[start..range.end]);
        self.last_end = Some(range.end);
    }

    fn push_break(&mut self, src: &str, range: Range<usize>) {
        self.push(src, range);
        if !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }
}

struct HeadingState {
    level: u8,
    title: String,
    line: usize,
    depth: usize,
}

struct CodeState {
    lang: Option<String>,
    text: String,
    fence: Option<Range<usize>>,
}

struct Scanner<'s> {
    src: &'s str,
    first_line: usize,
    newlines: Vec<usize>,
    events: Vec<Event>,
    containers: Vec<Container>,
    inline: Option<InlineSource>,
    heading: Option<HeadingState>,
    code: Option<CodeState>,
    /// Depth inside a block this scanner does not model.
    skip: usize,
}

impl<'s> Scanner<'s> {
    fn new(src: &'s str, first_line: usize) -> Self {
        Self {
            src,
            first_line,
            newlines: src.match_indices('\n').map(|(i, _)| i).collect(),
            events: Vec::new(),
            containers: Vec::new(),
            inline: None,
            heading: None,
            code: None,
            skip: 0,
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.first_line + self.newlines.partition_point(|&nl| nl < offset)
    }

    fn feed(&mut self, event: MdEvent<'_>, range: Range<usize>) {
        if self.skip > 0 {
            match event {
                MdEvent::Start(_) => self.skip += 1,
                MdEvent::End(_) => self.skip -= 1,
                _ => {}
            }
            return;
        }

        if let Some(code) = self.code.as_mut() {
            match event {
                MdEvent::Text(text) => code.text.push_str(&text),
                MdEvent::End(_) => self.finish_code(),
                _ => {}
            }
            return;
        }

        if let Some(heading) = self.heading.as_mut() {
            match event {
                MdEvent::Text(text) | MdEvent::Code(text) | MdEvent::InlineHtml(text) => {
                    heading.title.push_str(&text)
                }
                MdEvent::SoftBreak | MdEvent::HardBreak => heading.title.push(' '),
                MdEvent::Start(_) => heading.depth += 1,
                MdEvent::End(_) if heading.depth > 0 => heading.depth -= 1,
                MdEvent::End(_) => self.finish_heading(),
                _ => {}
            }
            return;
        }

        let event = match self.feed_inline(event, range.clone()) {
            Some(event) => event,
            None => return,
        };

        match event {
            MdEvent::Start(Tag::Paragraph) => self.inline = Some(InlineSource::new(true)),
            MdEvent::Start(Tag::Heading { level, .. }) => {
                if self.containers.is_empty() {
                    self.heading = Some(HeadingState {
                        level: level as u8,
                        title: String::new(),
                        line: self.line_of(range.start),
                        depth: 0,
                    });
                } else {
                    self.inline = Some(InlineSource::new(true));
                }
            }
            MdEvent::Start(Tag::CodeBlock(kind)) => {
                let (lang, fence) = match kind {
                    CodeBlockKind::Fenced(info) => (
                        info.split_whitespace().next().map(str::to_string),
                        Some(range),
                    ),
                    CodeBlockKind::Indented => (None, None),
                };
                self.code = Some(CodeState {
                    lang,
                    text: String::new(),
                    fence,
                });
            }
            MdEvent::Start(Tag::BlockQuote(_)) => self.containers.push(Container::Quote(Vec::new())),
            MdEvent::Start(Tag::List(start)) => self.containers.push(Container::List(List {
                ordered: start.is_some(),
                start: start.unwrap_or(1),
                items: Vec::new(),
            })),
            MdEvent::Start(Tag::Item) => self.containers.push(Container::Item(Vec::new())),
            MdEvent::Start(Tag::HtmlBlock) => {
                let src = self.src;
                let raw = src[range].trim_end();
                if !raw.is_empty() {
                    self.emit(Block::Prose(raw.to_string()));
                }
                self.skip = 1;
            }
            MdEvent::Start(_) => self.skip = 1,
            MdEvent::End(_) => self.close_container(),
            _ => {}
        }
    }

    /// Route inline-level events into the open inline source. Returns the
    /// event back when it is block structure for [`Scanner::feed`] to handle.
    fn feed_inline<'e>(&mut self, event: MdEvent<'e>, range: Range<usize>) -> Option<MdEvent<'e>> {
        let src = self.src;

        if self.inline.is_none() && (is_inline_event(&event) || is_inline_start(&event)) {
            self.inline = Some(InlineSource::new(false));
        }
        let Some(inline) = self.inline.as_mut() else {
            return Some(event);
        };

        if inline.depth > 0 {
            match event {
                MdEvent::Start(_) => inline.depth += 1,
                MdEvent::End(_) => inline.depth -= 1,
                _ => {}
            }
            return None;
        }

        if is_inline_start(&event) {
            inline.push(src, range);
            inline.depth = 1;
            return None;
        }
        match event {
            MdEvent::SoftBreak | MdEvent::HardBreak => {
                inline.push_break(src, range);
                None
            }
            ref e if is_inline_event(e) => {
                inline.push(src, range);
                None
            }
            MdEvent::End(_) if inline.explicit => {
                self.flush_inline();
                None
            }
            other => {
                self.flush_inline();
                Some(other)
            }
        }
    }

    fn flush_inline(&mut self) {
        let Some(inline) = self.inline.take() else {
            return;
        };
        let text = inline.text.trim();
        if !text.is_empty() {
            self.emit(Block::Prose(text.to_string()));
        }
    }

    fn finish_heading(&mut self) {
        let Some(heading) = self.heading.take() else {
            return;
        };
        self.events.push(Event::Heading {
            level: heading.level,
            title: heading.title.trim().to_string(),
            line: heading.line,
        });
    }

    fn finish_code(&mut self) {
        let Some(code) = self.code.take() else {
            return;
        };

        if let Some(fence) = &code.fence {
            if !is_closed_fence(&self.src[fence.clone()]) {
                let line = self.line_of(fence.start);
                self.events.push(Event::UnterminatedFence { line });
            }
        }

        let mut text = code.text;
        if text.ends_with('\n') {
            text.pop();
        }
        self.emit(Block::Code(CodeSample {
            lang: code.lang,
            text,
        }));
    }

    fn close_container(&mut self) {
        match self.containers.pop() {
            Some(Container::Quote(blocks)) => self.emit(Block::Quote(blocks)),
            Some(Container::List(list)) => self.emit(Block::List(list)),
            Some(Container::Item(blocks)) => {
                if let Some(Container::List(list)) = self.containers.last_mut() {
                    list.items.push(blocks);
                }
            }
            None => {}
        }
    }

    /// Append a finished block to the innermost container, or to the output.
    fn emit(&mut self, block: Block) {
        match self.containers.last_mut() {
            Some(Container::Quote(blocks)) | Some(Container::Item(blocks)) => blocks.push(block),
            Some(Container::List(list)) => list.items.push(vec![block]),
            None => self.events.push(Event::Block(block)),
        }
    }

    fn finish(mut self) -> Vec<Event> {
        self.flush_inline();
        self.finish_code();
        self.finish_heading();
        while !self.containers.is_empty() {
            self.close_container();
        }
        self.events
    }
}

fn is_inline_start(event: &MdEvent<'_>) -> bool {
    matches!(
        event,
        MdEvent::Start(
            Tag::Emphasis
                | Tag::Strong
                | Tag::Strikethrough
                | Tag::Link { .. }
                | Tag::Image { .. }
        )
    )
}

fn is_inline_event(event: &MdEvent<'_>) -> bool {
    matches!(
        event,
        MdEvent::Text(_)
            | MdEvent::Code(_)
            | MdEvent::InlineHtml(_)
            | MdEvent::Html(_)
            | MdEvent::InlineMath(_)
            | MdEvent::DisplayMath(_)
            | MdEvent::FootnoteReference(_)
            | MdEvent::TaskListMarker(_)
            | MdEvent::SoftBreak
            | MdEvent::HardBreak
    )
}

/// Whether the source of a fenced block ends with a closing fence.
fn is_closed_fence(source: &str) -> bool {
    let strip = |line: &str| {
        line.trim_start_matches([' ', '\t', '>'])
            .trim_end()
            .to_string()
    };

    let mut lines = source.trim_end().lines();
    let Some(opener) = lines.next().map(strip) else {
        return false;
    };
    let Some(marker) = opener.chars().next() else {
        return false;
    };
    let open_len = opener.chars().take_while(|&c| c == marker).count();

    match lines.last().map(strip) {
        Some(closer) => {
            !closer.is_empty()
                && closer.chars().all(|c| c == marker)
                && closer.chars().count() >= open_len
        }
        None => false,
    }
}
