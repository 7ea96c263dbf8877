//! Output directory planning, artifact naming and purging.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::Serialize;

use crate::config::BuildOptions;
use crate::entries::{EntryPoint, EntryPointRegistry};
use crate::error::{ConfigError, Result};

/// File name of the entry -> artifact map written next to the artifacts.
pub const MANIFEST_FILE: &str = "manifest.json";

const HASH_LEN: usize = 8;

/// A validated output plan.
///
/// `out_dir` is absolute and always a strict descendant of `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutputConfig {
    pub root: PathBuf,
    pub out_dir: PathBuf,
    pub purge_before_build: bool,
    pub emit_source_maps: bool,
    pub hash_names: bool,
    /// Entry points with sources resolved against the root, in registration order
    pub targets: Vec<EntryPoint>,
}

/// One artifact to be written for an entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedArtifact {
    pub entry: String,
    pub source: PathBuf,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<String>,
}

pub struct BuildOutputPlanner {
    root: PathBuf,
}

impl BuildOutputPlanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Validate the output directory and plan one target per entry point.
    ///
    /// Resolution is lexical: `..` components are collapsed without touching
    /// the filesystem.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidOutputDirectory` when `out_dir` does not
    /// resolve strictly inside the project root. The root itself is rejected
    /// since purging it would delete the project.
    pub fn plan(&self, entries: &EntryPointRegistry, options: &BuildOptions) -> Result<BuildOutputConfig> {
        let root = std::path::absolute(&self.root)?.clean();
        let out_dir = root.join(&options.out_dir).clean();

        if !is_strict_descendant(&out_dir, &root) {
            return Err(ConfigError::InvalidOutputDirectory { out_dir, root });
        }

        let targets = entries
            .iter()
            .map(|entry| EntryPoint {
                name: entry.name.clone(),
                source: root.join(&entry.source).clean(),
            })
            .collect();

        tracing::debug!(out_dir = %out_dir.display(), purge = options.empty_out_dir, "planned build output");

        Ok(BuildOutputConfig {
            root,
            out_dir,
            purge_before_build: options.empty_out_dir,
            emit_source_maps: options.sourcemap,
            hash_names: options.hash,
            targets,
        })
    }
}

fn is_strict_descendant(path: &Path, root: &Path) -> bool {
    path != root && path.starts_with(root)
}

impl BuildOutputConfig {
    /// Plan the artifact for `entry` given its final content.
    pub fn artifact(&self, entry: &EntryPoint, content: &[u8]) -> PlannedArtifact {
        let hash = self.hash_names.then_some(content);
        let file_name = artifact_file_name(&entry.name, hash);
        let source_map = self.emit_source_maps.then(|| format!("{file_name}.map"));
        PlannedArtifact {
            entry: entry.name.clone(),
            source: entry.source.clone(),
            file_name,
            source_map,
        }
    }

    /// Remove every child of `out_dir`, creating it when missing.
    ///
    /// Returns the number of removed entries.
    pub fn purge(&self) -> Result<usize> {
        purge_dir(&self.out_dir, &self.root)
    }
}

/// Deterministic artifact name for an entry point.
///
/// With content, the name carries the first 8 hex digits of its BLAKE3 hash.
///
/// # Example
///
/// ```
/// use keel_config::artifact_file_name;
///
/// assert_eq!(artifact_file_name("main", None), "main.js");
/// let hashed = artifact_file_name("main", Some(b"console.log(1)"));
/// assert!(hashed.starts_with("main-") && hashed.ends_with(".js"));
/// assert_eq!(hashed, artifact_file_name("main", Some(b"console.log(1)")));
/// ```
pub fn artifact_file_name(entry: &str, content: Option<&[u8]>) -> String {
    match content {
        Some(content) => format!("{entry}-{}.js", content_hash(content)),
        None => format!("{entry}.js"),
    }
}

pub fn content_hash(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    hash.to_hex()[..HASH_LEN].to_string()
}

impl PlannedArtifact {
    /// A version 3 source map pointing back at the entry source.
    pub fn source_map_json(&self, root: &Path, original: &str) -> String {
        let source = self
            .source
            .strip_prefix(root)
            .unwrap_or(&self.source)
            .to_string_lossy()
            .replace('\\', "/");
        serde_json::json!({
            "version": 3,
            "file": self.file_name,
            "sources": [source],
            "sourcesContent": [original],
            "names": [],
            "mappings": "",
        })
        .to_string()
    }
}

/// Entry name -> artifact file name, in build order.
pub fn manifest_json(artifacts: &[PlannedArtifact]) -> String {
    let map: indexmap::IndexMap<&str, &str> = artifacts
        .iter()
        .map(|artifact| (artifact.entry.as_str(), artifact.file_name.as_str()))
        .collect();
    // serializing string maps cannot fail
    serde_json::to_string_pretty(&map).unwrap_or_default()
}

/// Remove the contents of `dir`, refusing anything outside `root`.
pub fn purge_dir(dir: &Path, root: &Path) -> Result<usize> {
    let dir = dir.clean();
    if !is_strict_descendant(&dir, &root.clean()) {
        return Err(ConfigError::InvalidOutputDirectory {
            out_dir: dir,
            root: root.to_path_buf(),
        });
    }

    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        return Ok(0);
    }

    if !dir.is_dir() {
        return Err(ConfigError::InvalidValue {
            field: "build.outDir".to_string(),
            hint: Some(format!("{} exists but is not a directory", dir.display())),
        });
    }

    let mut removed = 0;
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }

    tracing::debug!(dir = %dir.display(), removed, "purged output directory");
    Ok(removed)
}
