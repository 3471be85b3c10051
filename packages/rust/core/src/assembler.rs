//! Output directory assembler.
//!
//! Writes rendered pages and JSON artifacts under the output root, and
//! finishes with a `manifest.json` listing every artifact's checksum.
//!
//! ```text
//! <output_root>/
//! ├── index.html
//! ├── toc.json
//! ├── search.json
//! ├── manifest.json
//! ├── objects.html
//! └── functions/
//!     └── scope.html
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use docweave_shared::{CURRENT_SCHEMA_VERSION, DocweaveError, Result};

/// Metadata for a single written artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// The `manifest.json` written at the output root. Contains no timestamps,
/// so identical input yields an identical manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteManifest {
    pub schema_version: u32,
    pub tool_version: String,
    pub site_title: String,
    pub document_count: usize,
    /// Sorted by path. Does not include `manifest.json` itself.
    pub artifacts: Vec<ArtifactMeta>,
}

/// Writes artifacts under one output root and records what was written.
#[derive(Debug)]
pub struct Assembler {
    output_root: PathBuf,
    written: Vec<ArtifactMeta>,
}

impl Assembler {
    /// Create the output root if needed.
    pub fn new(output_root: impl Into<PathBuf>) -> Result<Self> {
        let output_root = output_root.into();
        std::fs::create_dir_all(&output_root)
            .map_err(|e| DocweaveError::write(&output_root, e))?;
        debug!(path = %output_root.display(), "output root ready");

        Ok(Self {
            output_root,
            written: Vec::new(),
        })
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn written(&self) -> &[ArtifactMeta] {
        &self.written
    }

    /// Write `content` to `rel_path` under the output root.
    pub fn write_artifact(&mut self, rel_path: &str, content: &[u8]) -> Result<&ArtifactMeta> {
        let target = self.output_root.join(rel_path);
        write_atomic(&target, content)?;

        let mut hasher = Sha256::new();
        hasher.update(content);
        let meta = ArtifactMeta {
            path: rel_path.to_string(),
            sha256: format!("{:x}", hasher.finalize()),
            size_bytes: content.len(),
        };
        debug!(path = %meta.path, bytes = meta.size_bytes, "wrote artifact");

        self.written.push(meta);
        Ok(&self.written[self.written.len() - 1])
    }

    /// Serialize `data` as pretty JSON and write it to `rel_path`.
    pub fn write_json<T: Serialize>(&mut self, rel_path: &str, data: &T) -> Result<&ArtifactMeta> {
        let mut json = serde_json::to_string_pretty(data)
            .map_err(|e| DocweaveError::Serialize(format!("{rel_path}: {e}")))?;
        json.push('\n');
        self.write_artifact(rel_path, json.as_bytes())
    }

    /// Write `manifest.json` and return it.
    #[instrument(skip(self), fields(output = %self.output_root.display()))]
    pub fn finish(
        mut self,
        site_title: &str,
        tool_version: &str,
        document_count: usize,
    ) -> Result<SiteManifest> {
        self.written.sort_by(|a, b| a.path.cmp(&b.path));

        let manifest = SiteManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            tool_version: tool_version.to_string(),
            site_title: site_title.to_string(),
            document_count,
            artifacts: self.written.clone(),
        };
        self.write_json("manifest.json", &manifest)?;

        info!(
            artifacts = manifest.artifacts.len(),
            document_count, "site assembly complete"
        );
        Ok(manifest)
    }
}

/// Write through a temp sibling and rename, creating parent directories.
fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DocweaveError::write(parent, e))?;
    }

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| DocweaveError::write(target, e))?;
    std::fs::rename(&temp, target).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        DocweaveError::write(target, e)
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
