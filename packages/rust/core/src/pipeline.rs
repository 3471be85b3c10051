//! End-to-end pipeline: load → parse → index → render → assemble.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, instrument, warn};

use docweave_markdown::Diagnostic;
use docweave_shared::{BuildConfig, DocId, Document, Result};

use crate::assembler::{ArtifactMeta, Assembler};
use crate::index::{build_index, build_toc};
use crate::loader::{Loader, SourceFile};
use crate::render::{RenderContext, render_index_page, render_page};
use crate::search::build_search_index;

/// Result of [`build_site`].
#[derive(Debug)]
pub struct BuildReport {
    pub output_root: PathBuf,
    pub document_count: usize,
    /// Sections across all documents.
    pub section_count: usize,
    /// Everything written except `manifest.json`, sorted by path.
    pub artifacts: Vec<ArtifactMeta>,
    pub elapsed: Duration,
}

/// Result of [`check_site`].
#[derive(Debug)]
pub struct CheckReport {
    pub documents: Vec<DocumentCheck>,
}

impl CheckReport {
    pub fn diagnostic_count(&self) -> usize {
        self.documents.iter().map(|d| d.diagnostics.len()).sum()
    }
}

/// Per-document summary produced by [`check_site`].
#[derive(Debug)]
pub struct DocumentCheck {
    pub id: DocId,
    pub title: String,
    pub sections: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each document finishes parsing, in completion order.
    fn document_parsed(&self, id: &DocId, current: usize, total: usize);
    /// Called after each page is written.
    fn page_written(&self, path: &str, current: usize, total: usize);
    /// Called when the build completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_parsed(&self, _id: &DocId, _current: usize, _total: usize) {}
    fn page_written(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Run the full build.
///
/// 1. Enumerate content files
/// 2. Parse them on the blocking pool, at most `parse_concurrency` at once
/// 3. Build the navigation index once every parse has finished
/// 4. Render and write one page per document
/// 5. Write `index.html`, `toc.json`, `search.json` and `manifest.json`
#[instrument(skip_all, fields(
    input = %config.input_root.display(),
    output = %config.output_root.display()
))]
pub async fn build_site(
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
) -> Result<BuildReport> {
    let start = Instant::now();
    info!("starting build");

    // --- Phase 1: Load + parse ---
    progress.phase("Parsing documents");
    let loader = Loader::new(&config.input_root, &config.content)?;
    let parsed = load_and_parse(&loader, config.render.parse_concurrency, progress).await?;
    let documents: Vec<Document> = parsed.into_iter().map(|(doc, _)| doc).collect();
    let section_count: usize = documents.iter().map(Document::section_count).sum();
    info!(documents = documents.len(), section_count, "documents parsed");

    // --- Phase 2: Index ---
    progress.phase("Building navigation index");
    let index = build_index(&documents);

    // --- Phase 3: Render pages ---
    progress.phase("Rendering pages");
    let mut assembler = Assembler::new(&config.output_root)?;
    let ctx = RenderContext {
        index: &index,
        site: &config.site,
        render: &config.render,
        extensions: &config.content.extensions,
    };

    let total = documents.len();
    for (i, doc) in documents.iter().enumerate() {
        let rel_path = doc.id.html_path();
        assembler.write_artifact(&rel_path, render_page(doc, &ctx).as_bytes())?;
        progress.page_written(&rel_path, i + 1, total);
    }

    // --- Phase 4: Site-level artifacts ---
    progress.phase("Writing site artifacts");
    if documents.iter().any(|d| d.id.as_str() == "index") {
        debug!("root index document present, skipping generated index page");
    } else {
        assembler.write_artifact(
            "index.html",
            render_index_page(&index, &config.site).as_bytes(),
        )?;
    }
    assembler.write_json("toc.json", &build_toc(&index, &config.site.title))?;
    if config.render.search_index {
        let entries =
            build_search_index(&documents, &index, config.render.search_excerpt_chars);
        debug!(entries = entries.len(), "search index built");
        assembler.write_json("search.json", &entries)?;
    }

    let manifest = assembler.finish(&config.site.title, &config.tool_version, total)?;

    let report = BuildReport {
        output_root: config.output_root.clone(),
        document_count: total,
        section_count,
        artifacts: manifest.artifacts,
        elapsed: start.elapsed(),
    };

    info!(
        documents = report.document_count,
        artifacts = report.artifacts.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "build complete"
    );
    progress.done(&report);
    Ok(report)
}

/// Load, parse and index without writing anything, collecting diagnostics.
#[instrument(skip_all, fields(input = %config.input_root.display()))]
pub async fn check_site(config: &BuildConfig) -> Result<CheckReport> {
    let loader = Loader::new(&config.input_root, &config.content)?;
    let parsed = load_and_parse(&loader, config.render.parse_concurrency, &SilentProgress).await?;

    let (documents, diagnostics): (Vec<Document>, Vec<Vec<Diagnostic>>) =
        parsed.into_iter().unzip();
    let index = build_index(&documents);

    let checks: Vec<DocumentCheck> = documents
        .iter()
        .zip(diagnostics)
        .map(|(doc, diagnostics)| {
            for diagnostic in &diagnostics {
                warn!(id = %doc.id, "{diagnostic}");
            }
            DocumentCheck {
                id: doc.id.clone(),
                title: index
                    .get(&doc.id)
                    .map(|e| e.title.clone())
                    .unwrap_or_else(|| doc.id.to_string()),
                sections: doc.section_count(),
                diagnostics,
            }
        })
        .collect();

    let report = CheckReport { documents: checks };
    info!(
        documents = report.documents.len(),
        diagnostics = report.diagnostic_count(),
        "check complete"
    );
    Ok(report)
}

/// Hash and parse one source file into a [`Document`].
pub fn parse_source(source: SourceFile) -> (Document, Vec<Diagnostic>) {
    let mut hasher = Sha256::new();
    hasher.update(source.raw.as_bytes());
    let content_hash = format!("{:x}", hasher.finalize());

    let parsed = docweave_markdown::parse(&source.raw);
    debug!(
        id = %source.id,
        sections = parsed.sections.len(),
        diagnostics = parsed.diagnostics.len(),
        "parsed document"
    );

    let doc = Document {
        id: source.id,
        source_path: source.path,
        raw: source.raw,
        content_hash,
        front_matter: parsed.front_matter,
        preamble: parsed.preamble,
        sections: parsed.sections,
    };
    (doc, parsed.diagnostics)
}

// ---------------------------------------------------------------------------
// Parse pool
// ---------------------------------------------------------------------------

type Parsed = (Document, Vec<Diagnostic>);

/// Parse every enumerated file with at most `limit` parses in flight, and
/// return the results in enumeration order.
async fn load_and_parse(
    loader: &Loader,
    limit: usize,
    progress: &dyn ProgressReporter,
) -> Result<Vec<Parsed>> {
    let sources = loader.documents()?;
    let total = sources.len();
    let limit = limit.max(1);
    debug!(total, limit, "parsing documents");

    let mut slots: Vec<Option<Parsed>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);
    let mut tasks: JoinSet<(usize, Parsed)> = JoinSet::new();
    let mut completed = 0;

    for (position, source) in sources.enumerate() {
        let source = source?;
        while tasks.len() >= limit {
            if let Some(joined) = tasks.join_next().await {
                completed += 1;
                settle(joined, &mut slots, completed, total, progress);
            }
        }
        tasks.spawn_blocking(move || (position, parse_source(source)));
    }

    while let Some(joined) = tasks.join_next().await {
        completed += 1;
        settle(joined, &mut slots, completed, total, progress);
    }

    Ok(slots.into_iter().flatten().collect())
}

fn settle(
    joined: std::result::Result<(usize, Parsed), JoinError>,
    slots: &mut [Option<Parsed>],
    completed: usize,
    total: usize,
    progress: &dyn ProgressReporter,
) {
    match joined {
        Ok((position, parsed)) => {
            progress.document_parsed(&parsed.0.id, completed, total);
            slots[position] = Some(parsed);
        }
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => unreachable!("parse task cancelled: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
