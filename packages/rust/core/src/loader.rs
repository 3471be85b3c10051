//! Content loader.
//!
//! Enumerates lesson files under the input root and reads them lazily, one
//! per iterator step. Every call to [`Loader::documents`] walks the
//! directory again, so a loader can be reused across runs.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use docweave_shared::{ContentConfig, DocId, DocweaveError, Result};

/// Raw text of one content file, paired with its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: DocId,
    pub path: PathBuf,
    /// File contents with line endings normalized to `\n`.
    pub raw: String,
}

/// Finds and reads content files under a root directory.
#[derive(Debug, Clone)]
pub struct Loader {
    root: PathBuf,
    extensions: Vec<String>,
    exclude: GlobSet,
}

impl Loader {
    /// Create a loader. Fails only on invalid `exclude` patterns; the root is
    /// checked on each [`Loader::documents`] call.
    pub fn new(root: impl Into<PathBuf>, config: &ContentConfig) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            exclude: build_globset(&config.exclude)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate content files in identifier order.
    ///
    /// Enumeration happens now; file contents are read as the returned
    /// iterator advances.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn documents(&self) -> Result<Documents> {
        if !self.root.is_dir() {
            return Err(DocweaveError::not_found(&self.root));
        }

        let mut found: Vec<(DocId, PathBuf)> = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                DocweaveError::read(path, std::io::Error::from(e))
            })?;

            if !entry.file_type().is_file() || !self.has_content_extension(entry.path()) {
                continue;
            }

            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if self.exclude.is_match(rel) {
                debug!(path = %rel.display(), "excluded by pattern");
                continue;
            }
            let Some(id) = DocId::from_relative_path(rel) else {
                continue;
            };

            found.push((id, entry.into_path()));
        }

        found.sort();
        found.dedup_by(|later, earlier| {
            let duplicate = later.0 == earlier.0;
            if duplicate {
                warn!(
                    id = %later.0,
                    kept = %earlier.1.display(),
                    skipped = %later.1.display(),
                    "two files map to the same document id"
                );
            }
            duplicate
        });

        debug!(count = found.len(), "content files enumerated");
        Ok(Documents {
            entries: found.into_iter(),
        })
    }

    fn has_content_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
    }
}

/// Lazy iterator over the enumerated content files.
#[derive(Debug)]
pub struct Documents {
    entries: std::vec::IntoIter<(DocId, PathBuf)>,
}

impl Iterator for Documents {
    type Item = Result<SourceFile>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, path) = self.entries.next()?;
        Some(read_source(id, path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for Documents {}

fn read_source(id: DocId, path: PathBuf) -> Result<SourceFile> {
    let raw = std::fs::read_to_string(&path).map_err(|e| DocweaveError::read(&path, e))?;
    let raw = if raw.contains('\r') {
        raw.replace("\r\n", "\n")
    } else {
        raw
    };
    debug!(%id, bytes = raw.len(), "read content file");
    Ok(SourceFile { id, path, raw })
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            continue;
        }
        let glob = Glob::new(trimmed).map_err(|e| {
            DocweaveError::config(format!("invalid exclude pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| DocweaveError::config(format!("failed to build exclude matcher: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn ids(loader: &Loader) -> Vec<String> {
        loader
            .documents()
            .unwrap()
            .map(|s| s.unwrap().id.to_string())
            .collect()
    }

    #[test]
    fn enumerates_markdown_in_id_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "objects.md", "# Objects");
        write(tmp.path(), "arrays.markdown", "# Arrays");
        write(tmp.path(), "functions/scope.md", "# Scope");
        write(tmp.path(), "functions/arrows.MD", "# Arrows");
        write(tmp.path(), "notes.txt", "ignored");

        let loader = Loader::new(tmp.path(), &ContentConfig::default()).unwrap();
        assert_eq!(
            ids(&loader),
            vec!["arrays", "functions/arrows", "functions/scope", "objects"]
        );
    }

    #[test]
    fn skips_hidden_entries_and_excluded_globs() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "json.md", "# JSON");
        write(tmp.path(), ".hidden.md", "# Hidden");
        write(tmp.path(), ".git/notes.md", "# Git");
        write(tmp.path(), "drafts/wip.md", "# WIP");

        let config = ContentConfig {
            exclude: vec!["drafts/**".into()],
            ..ContentConfig::default()
        };
        let loader = Loader::new(tmp.path(), &config).unwrap();
        assert_eq!(ids(&loader), vec!["json"]);
    }

    #[test]
    fn missing_root_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = Loader::new(tmp.path().join("absent"), &ContentConfig::default()).unwrap();
        let err = loader.documents().unwrap_err();
        assert!(matches!(err, DocweaveError::NotFound { .. }));
    }

    #[test]
    fn file_root_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "single.md", "# Single");
        let loader =
            Loader::new(tmp.path().join("single.md"), &ContentConfig::default()).unwrap();
        assert!(matches!(
            loader.documents().unwrap_err(),
            DocweaveError::NotFound { .. }
        ));
    }

    #[test]
    fn invalid_utf8_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();

        let loader = Loader::new(tmp.path(), &ContentConfig::default()).unwrap();
        let first = loader.documents().unwrap().next().unwrap();
        assert!(matches!(first, Err(DocweaveError::Read { .. })));
    }

    #[test]
    fn contents_are_read_lazily_and_reread_per_call() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "dates.md", "# Dates\r\n\r\nv1\r\n");
        let loader = Loader::new(tmp.path(), &ContentConfig::default()).unwrap();

        let mut docs = loader.documents().unwrap();
        assert_eq!(docs.len(), 1);
        write(tmp.path(), "dates.md", "# Dates\r\n\r\nv2\r\n");
        let source = docs.next().unwrap().unwrap();
        assert_eq!(source.raw, "# Dates\n\nv2\n");

        write(tmp.path(), "dates.md", "# Dates\n\nv3\n");
        let again = loader.documents().unwrap().next().unwrap().unwrap();
        assert_eq!(again.raw, "# Dates\n\nv3\n");
    }

    #[test]
    fn duplicate_ids_keep_first_path() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "json.markdown", "# From markdown");
        write(tmp.path(), "json.md", "# From md");

        let loader = Loader::new(tmp.path(), &ContentConfig::default()).unwrap();
        let docs: Vec<SourceFile> = loader.documents().unwrap().map(|d| d.unwrap()).collect();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].raw, "# From markdown");
    }

    #[test]
    fn invalid_exclude_pattern_is_config_error() {
        let config = ContentConfig {
            exclude: vec!["[unclosed".into()],
            ..ContentConfig::default()
        };
        let err = Loader::new("content", &config).unwrap_err();
        assert!(matches!(err, DocweaveError::Config { .. }));
    }
}
