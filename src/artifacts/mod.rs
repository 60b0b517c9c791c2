// src/artifacts/mod.rs

//! Post-build artifact collection.
//!
//! After a successful build, every declared artifact is copied into
//! `<output directory>/<build id>/`. Nothing here can fail a build: missing
//! sources, bad globs and copy errors are logged and skipped.

pub mod digest;
pub mod glob;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::fs::{FileSystem, RealFileSystem};

/// What to collect for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// Files or glob patterns, relative to `working_directory` when set.
    pub paths: Vec<String>,
    pub output_directory: Option<PathBuf>,
    pub working_directory: Option<PathBuf>,
}

/// One artifact copied into the build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedArtifact {
    pub source: PathBuf,
    pub target: PathBuf,
    pub bytes: u64,
    /// BLAKE3 hex digest of the copied content.
    pub digest: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedArtifacts {
    /// `<output directory>/<build id>`, when anything was attempted.
    pub build_directory: Option<PathBuf>,
    pub copied: Vec<CopiedArtifact>,
    /// Declared paths that matched no file.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ArtifactCollector {
    fs: Arc<dyn FileSystem>,
}

impl Default for ArtifactCollector {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl ArtifactCollector {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn collect(&self, spec: &ArtifactSpec, build_id: &str) -> CollectedArtifacts {
        let mut collected = CollectedArtifacts::default();
        if spec.paths.is_empty() {
            return collected;
        }
        let Some(output_directory) = spec.output_directory.as_deref() else {
            warn!(build_id, "no artifact output directory configured, skipping artifact copy");
            return collected;
        };

        let build_directory = output_directory.join(build_id);
        if let Err(err) = self.fs.create_dir_all(&build_directory) {
            warn!(
                build_id,
                dir = %build_directory.display(),
                error = %err,
                "cannot create artifact directory"
            );
            return collected;
        }
        collected.build_directory = Some(build_directory.clone());

        let root = spec
            .working_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        let mut seen_sources = HashSet::new();
        let mut targets = HashSet::new();
        for declared in &spec.paths {
            let sources = self.resolve(&root, declared, output_directory);
            if sources.is_empty() {
                warn!(build_id, artifact = %declared, "artifact not found");
                collected.missing.push(declared.clone());
                continue;
            }
            for source in sources {
                if !seen_sources.insert(source.clone()) {
                    continue;
                }
                let Some(target) = target_for(&root, &source, &build_directory, &mut targets)
                else {
                    warn!(build_id, source = %source.display(), "artifact name clashes, skipping");
                    continue;
                };
                if let Some(copied) = self.copy_one(&source, target) {
                    collected.copied.push(copied);
                }
            }
        }

        info!(
            build_id,
            dir = %build_directory.display(),
            copied = collected.copied.len(),
            missing = collected.missing.len(),
            "artifacts collected"
        );
        collected
    }

    fn resolve(&self, root: &Path, declared: &str, output_directory: &Path) -> Vec<PathBuf> {
        if glob::is_glob(declared) {
            return glob::expand(self.fs.as_ref(), root, declared, Some(output_directory))
                .unwrap_or_else(|err| {
                    warn!(artifact = %declared, error = %err, "cannot expand artifact pattern");
                    Vec::new()
                });
        }

        let path = Path::new(declared);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        if self.fs.is_file(&path) {
            vec![path]
        } else {
            Vec::new()
        }
    }

    fn copy_one(&self, source: &Path, target: PathBuf) -> Option<CopiedArtifact> {
        if let Some(parent) = target.parent() {
            if let Err(err) = self.fs.create_dir_all(parent) {
                warn!(dir = %parent.display(), error = %err, "cannot create artifact directory");
                return None;
            }
        }
        let bytes = match self.fs.copy(source, &target) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(source = %source.display(), error = %err, "failed to copy artifact");
                return None;
            }
        };
        let digest = match digest::compute_file_digest(self.fs.as_ref(), &target) {
            Ok(digest) => Some(digest),
            Err(err) => {
                warn!(target = %target.display(), error = %err, "cannot hash artifact");
                None
            }
        };
        debug!(source = %source.display(), target = %target.display(), bytes, "copied artifact");
        Some(CopiedArtifact {
            source: source.to_path_buf(),
            target,
            bytes,
            digest,
        })
    }
}

/// `<build dir>/<file name>`, or the source's path relative to `root` when
/// another artifact already took that name.
fn target_for(
    root: &Path,
    source: &Path,
    build_directory: &Path,
    taken: &mut HashSet<PathBuf>,
) -> Option<PathBuf> {
    let flat = build_directory.join(source.file_name()?);
    if taken.insert(flat.clone()) {
        return Some(flat);
    }
    let nested = build_directory.join(source.strip_prefix(root).ok()?);
    taken.insert(nested.clone()).then_some(nested)
}
