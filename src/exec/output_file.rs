// src/exec/output_file.rs

//! Best-effort persistence of a run's log to a file on disk.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Append-only log file. Write errors are logged once and then the file is
/// abandoned; they never fail the run.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
    file: Option<File>,
}

impl OutputFile {
    pub async fn open(path: &Path) -> Self {
        let file = match Self::open_append(path).await {
            Ok(file) => Some(file),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot open output file");
                None
            }
        };
        Self {
            path: path.to_path_buf(),
            file,
        }
    }

    async fn open_append(path: &Path) -> std::io::Result<File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        OpenOptions::new().create(true).append(true).open(path).await
    }

    pub async fn write_line(&mut self, line: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        if let Err(err) = file.write_all(&buf).await {
            warn!(path = %self.path.display(), error = %err, "error writing to output file");
            self.file = None;
        }
    }

    /// Flush and close; returns the path if the file exists afterwards.
    pub async fn finish(mut self) -> Option<PathBuf> {
        if let Some(file) = self.file.as_mut() {
            if let Err(err) = file.flush().await {
                warn!(path = %self.path.display(), error = %err, "error flushing output file");
            }
        }
        drop(self.file.take());
        tokio::fs::try_exists(&self.path)
            .await
            .unwrap_or(false)
            .then_some(self.path)
    }
}
