//! HTML page rendering.
//!
//! Pure string generation: one page per document plus the index page. Links
//! between content files are rewritten to their rendered `.html` targets.
//! Writing the results is the assembler's job.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use docweave_markdown::{escape_html, render_html};
use docweave_shared::{
    Block, CodeSample, DocId, Document, List, NavEntry, NavigationIndex, RenderConfig, Section,
    SiteConfig,
};

/// Everything a page render needs besides the document itself.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub index: &'a NavigationIndex,
    pub site: &'a SiteConfig,
    pub render: &'a RenderConfig,
    /// Content file extensions, used to spot links to other documents.
    pub extensions: &'a [String],
}

/// Render a complete HTML page for `doc`.
pub fn render_page(doc: &Document, ctx: &RenderContext<'_>) -> String {
    let root = root_prefix(&doc.id);
    let title = ctx
        .index
        .get(&doc.id)
        .map(|e| e.title.as_str())
        .unwrap_or(doc.id.as_str());

    let mut html = String::with_capacity(doc.raw.len() * 2 + 1024);
    push_head(&mut html, &format!("{title} · {}", ctx.site.title));
    push_header(&mut html, &root, &ctx.site.title);
    push_site_nav(&mut html, ctx.index, Some(&doc.id), &root);

    html.push_str("<main>\n");
    if let Some(entry) = ctx.index.get(&doc.id) {
        push_page_toc(&mut html, entry);
    }

    html.push_str("<article>\n");
    let resolve = |href: &str| resolve_link(href, ctx.extensions);
    for block in &doc.preamble {
        push_block(&mut html, block, ctx.render, &resolve);
    }
    for section in &doc.sections {
        push_section(&mut html, section, ctx.render, &resolve);
    }
    html.push_str("</article>\n");

    push_pager(&mut html, ctx.index, &doc.id, &root);
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

/// Render the site index page: the full table of contents.
pub fn render_index_page(index: &NavigationIndex, site: &SiteConfig) -> String {
    let mut html = String::new();
    push_head(&mut html, &site.title);
    push_header(&mut html, "", &site.title);

    html.push_str("<main>\n<nav class=\"contents\">\n<ul>\n");
    for entry in index.entries() {
        let _ = write!(
            html,
            "<li><a href=\"{}\">{}</a>",
            escape_html(&entry.href),
            escape_html(&entry.title)
        );
        push_heading_list(&mut html, entry, &entry.href);
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n</nav>\n</main>\n</body>\n</html>\n");
    html
}

/// Rewrite a link found in document text.
///
/// Relative links to content files (`arrays.md`, `../json.markdown#parse`)
/// point at the rendered `.html` page instead. Absolute URLs, root-relative
/// paths, fragments and links to other files are returned unchanged.
pub fn resolve_link(href: &str, extensions: &[String]) -> String {
    static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid regex")
    });

    if href.starts_with('#') || href.starts_with('/') || SCHEME_RE.is_match(href) {
        return href.to_string();
    }

    let (path, fragment) = match href.split_once('#') {
        Some((p, f)) => (p, Some(f)),
        None => (href, None),
    };

    let Some((stem, ext)) = path.rsplit_once('.') else {
        return href.to_string();
    };
    let is_content = !stem.is_empty()
        && !ext.contains('/')
        && extensions.iter().any(|e| e.eq_ignore_ascii_case(ext));
    if !is_content {
        return href.to_string();
    }

    match fragment {
        Some(f) => format!("{stem}.html#{f}"),
        None => format!("{stem}.html"),
    }
}

// ---------------------------------------------------------------------------
// Page chrome
// ---------------------------------------------------------------------------

/// `../` repeated once per directory level of `id`.
fn root_prefix(id: &DocId) -> String {
    "../".repeat(id.depth())
}

fn push_head(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(title));
    html.push_str("</head>\n<body>\n");
}

fn push_header(html: &mut String, root: &str, site_title: &str) {
    let _ = writeln!(
        html,
        "<header><a href=\"{root}index.html\">{}</a></header>",
        escape_html(site_title)
    );
}

fn push_site_nav(html: &mut String, index: &NavigationIndex, current: Option<&DocId>, root: &str) {
    html.push_str("<nav class=\"site-nav\">\n<ul>\n");
    for entry in index.entries() {
        let is_current = current == Some(&entry.doc_id);
        let attrs = if is_current {
            " class=\"current\" aria-current=\"page\""
        } else {
            ""
        };
        let _ = writeln!(
            html,
            "<li{attrs}><a href=\"{root}{}\">{}</a></li>",
            escape_html(&entry.href),
            escape_html(&entry.title)
        );
    }
    html.push_str("</ul>\n</nav>\n");
}

fn push_page_toc(html: &mut String, entry: &NavEntry) {
    if entry.headings.is_empty() {
        return;
    }
    html.push_str("<nav class=\"page-toc\">\n");
    push_heading_list(html, entry, "");
    html.push_str("\n</nav>\n");
}

/// Nested `<ul>` of a document's headings, linking to `{page}#{anchor}`.
fn push_heading_list(html: &mut String, entry: &NavEntry, page: &str) {
    if entry.headings.is_empty() {
        return;
    }

    let mut depth = 0;
    html.push_str("<ul>");
    for (i, heading) in entry.headings.iter().enumerate() {
        if i > 0 {
            if heading.depth > depth {
                html.push_str("<ul>");
            } else {
                html.push_str("</li>");
                for _ in heading.depth..depth {
                    html.push_str("</ul></li>");
                }
            }
        }
        depth = heading.depth;
        let _ = write!(
            html,
            "<li><a href=\"{}#{}\">{}</a>",
            escape_html(page),
            escape_html(&heading.anchor),
            escape_html(&heading.title)
        );
    }
    html.push_str("</li>");
    for _ in 0..depth {
        html.push_str("</ul></li>");
    }
    html.push_str("</ul>");
}

fn push_pager(html: &mut String, index: &NavigationIndex, id: &DocId, root: &str) {
    let prev = index.previous(id);
    let next = index.next(id);
    if prev.is_none() && next.is_none() {
        return;
    }

    html.push_str("<nav class=\"pager\">\n");
    if let Some(prev) = prev {
        let _ = writeln!(
            html,
            "<a rel=\"prev\" href=\"{root}{}\">← {}</a>",
            escape_html(&prev.href),
            escape_html(&prev.title)
        );
    }
    if let Some(next) = next {
        let _ = writeln!(
            html,
            "<a rel=\"next\" href=\"{root}{}\">{} →</a>",
            escape_html(&next.href),
            escape_html(&next.title)
        );
    }
    html.push_str("</nav>\n");
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

fn push_section<F>(html: &mut String, section: &Section, render: &RenderConfig, resolve: &F)
where
    F: Fn(&str) -> String,
{
    let level = section.level.clamp(1, 6);
    html.push_str("<section>\n");
    let _ = writeln!(
        html,
        "<h{level} id=\"{}\">{}</h{level}>",
        escape_html(&section.anchor),
        escape_html(&section.title)
    );
    for block in &section.blocks {
        push_block(html, block, render, resolve);
    }
    for child in &section.children {
        push_section(html, child, render, resolve);
    }
    html.push_str("</section>\n");
}

fn push_block<F>(html: &mut String, block: &Block, render: &RenderConfig, resolve: &F)
where
    F: Fn(&str) -> String,
{
    match block {
        Block::Prose(text) => {
            let _ = writeln!(html, "<p>{}</p>", render_html(text, resolve));
        }
        Block::Quote(blocks) => {
            html.push_str("<blockquote>\n");
            for block in blocks {
                push_block(html, block, render, resolve);
            }
            html.push_str("</blockquote>\n");
        }
        Block::Code(sample) => push_code(html, sample, render),
        Block::List(list) => push_list(html, list, render, resolve),
    }
}

fn push_code(html: &mut String, sample: &CodeSample, render: &RenderConfig) {
    match &sample.lang {
        Some(lang) => {
            let _ = write!(
                html,
                "<pre><code class=\"{}{}\">",
                escape_html(&render.code_class_prefix),
                escape_html(lang)
            );
        }
        None => html.push_str("<pre><code>"),
    }
    html.push_str(&escape_html(&sample.text));
    html.push_str("</code></pre>\n");
}

fn push_list<F>(html: &mut String, list: &List, render: &RenderConfig, resolve: &F)
where
    F: Fn(&str) -> String,
{
    let close = match (list.ordered, list.start) {
        (false, _) => {
            html.push_str("<ul>\n");
            "</ul>\n"
        }
        (true, 1) => {
            html.push_str("<ol>\n");
            "</ol>\n"
        }
        (true, start) => {
            let _ = writeln!(html, "<ol start=\"{start}\">");
            "</ol>\n"
        }
    };
    for item in &list.items {
        html.push_str("<li>");
        // A leading paragraph renders bare, as in a tight list.
        let rest = match item.split_first() {
            Some((Block::Prose(text), rest)) => {
                html.push_str(&render_html(text, resolve));
                rest
            }
            _ => item.as_slice(),
        };
        if !rest.is_empty() {
            html.push('\n');
            for block in rest {
                push_block(html, block, render, resolve);
            }
        }
        html.push_str("</li>\n");
    }
    html.push_str(close);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
