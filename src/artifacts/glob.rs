// src/artifacts/glob.rs

//! Glob expansion for artifact paths such as `target/*.jar`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};

use crate::fs::FileSystem;

/// Whether `pattern` contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// All files under `root` whose path relative to `root` matches `pattern`,
/// sorted. The walk never enters `exclude` or a symlinked directory.
pub fn expand(
    fs: &dyn FileSystem,
    root: &Path,
    pattern: &str,
    exclude: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let matcher = compile(pattern)?;
    let exclude = exclude.map(absolute);
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                let excluded = exclude.as_deref() == Some(absolute(&path).as_path());
                if excluded || fs.is_symlink(&path) {
                    continue;
                }
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if matcher.is_match(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
