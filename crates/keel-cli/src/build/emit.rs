//! Writing a compiled build to the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use keel_config::BuildOutputConfig;

use super::BuildOutput;
use crate::error::{BuildError, Result, ResultExt};

/// What a successful emit did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Entries removed from `out_dir` before writing
    pub purged: usize,
    /// Absolute paths and sizes of written files, in write order
    pub written: Vec<(PathBuf, u64)>,
}

/// Purges the output directory and writes a build into it.
///
/// A run is all or nothing: when any write fails, files this run created are
/// removed and files it overwrote get their previous contents back. With
/// purging an aborted build leaves `out_dir` empty; without it the prior
/// build is left as it was.
#[derive(Debug, Default)]
pub struct ArtifactEmitter;

impl ArtifactEmitter {
    pub fn new() -> Self {
        Self
    }

    pub fn emit(&self, plan: &BuildOutputConfig, build: &BuildOutput) -> Result<EmitReport> {
        let purged = if plan.purge_before_build {
            plan.purge()?
        } else {
            fs::create_dir_all(&plan.out_dir)
                .context(format!("Failed to create output directory {}", plan.out_dir.display()))?;
            0
        };

        let mut journal = Vec::with_capacity(build.files.len());
        let mut written = Vec::with_capacity(build.files.len());
        for file in &build.files {
            let path = plan.out_dir.join(&file.file_name);
            match replace(&path, &file.contents, &mut journal) {
                Ok(()) => written.push((path, file.contents.len() as u64)),
                Err(err) => {
                    tracing::warn!(file = %path.display(), error = %err, "write failed, rolling back");
                    rollback(&journal);
                    return Err(BuildError::AssetWriteFailed(format!("{}: {err}", path.display())).into());
                }
            }
        }

        tracing::info!(out_dir = %plan.out_dir.display(), files = written.len(), purged, "emitted build");
        Ok(EmitReport { purged, written })
    }
}

/// A path touched by this run and what it held before.
struct Replaced {
    path: PathBuf,
    previous: Option<Vec<u8>>,
}

/// Write `contents` to `path`, recording the prior contents first so the
/// write can be undone.
fn replace(path: &Path, contents: &[u8], journal: &mut Vec<Replaced>) -> std::io::Result<()> {
    let previous = match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => return Err(err),
    };
    journal.push(Replaced {
        path: path.to_path_buf(),
        previous,
    });
    fs::write(path, contents)
}

fn rollback(journal: &[Replaced]) {
    for entry in journal.iter().rev() {
        let result = match &entry.previous {
            Some(bytes) => fs::write(&entry.path, bytes),
            None => remove(&entry.path),
        };
        if let Err(err) = result {
            tracing::warn!(file = %entry.path.display(), error = %err, "could not undo partial output");
        }
    }
}

fn remove(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
