//! Compiling entry points into artifacts.
//!
//! The artifact for an entry is its source with every environment reference
//! and `define` key replaced from the load-time snapshot. Compilation is
//! entirely in memory; [`ArtifactEmitter`] writes the result to disk and the
//! dev server serves it directly.

mod emit;

pub use emit::{ArtifactEmitter, EmitReport};

use keel_config::{MANIFEST_FILE, PlannedArtifact, ResolvedConfig, manifest_json};

use crate::error::{BuildError, Result};

/// One file produced by a build, named relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// Everything a build produces, in write order.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub artifacts: Vec<PlannedArtifact>,
    /// Artifacts, their source maps and the manifest (last)
    pub files: Vec<OutputFile>,
}

impl BuildOutput {
    pub fn get(&self, file_name: &str) -> Option<&OutputFile> {
        self.files.iter().find(|file| file.file_name == file_name)
    }
}

/// Compile every entry point of `config`.
///
/// # Errors
///
/// Fails on the first entry whose source cannot be read or whose
/// substitution references a variable missing from the snapshot. Nothing is
/// written to disk either way.
pub fn compile(config: &ResolvedConfig) -> Result<BuildOutput> {
    let output = config.output();
    let injector = config.injector();
    let mut build = BuildOutput::default();

    for entry in &output.targets {
        let bytes = std::fs::read(&entry.source)
            .map_err(|_| BuildError::EntryNotFound(entry.source.clone()))?;
        let source = String::from_utf8(bytes).map_err(|_| BuildError::InvalidSource {
            entry: entry.name.clone(),
            path: entry.source.clone(),
        })?;

        let compiled = injector
            .substitute(&source)
            .map_err(|source| BuildError::Substitution {
                entry: entry.name.clone(),
                source,
            })?;

        let artifact = output.artifact(entry, compiled.as_bytes());
        tracing::debug!(entry = %artifact.entry, file = %artifact.file_name, "compiled entry");

        let mut contents = compiled.into_bytes();
        if let Some(map_name) = &artifact.source_map {
            contents.extend_from_slice(format!("\n//# sourceMappingURL={map_name}\n").as_bytes());
            build.files.push(OutputFile {
                file_name: artifact.file_name.clone(),
                contents,
            });
            build.files.push(OutputFile {
                file_name: map_name.clone(),
                contents: artifact.source_map_json(&output.root, &source).into_bytes(),
            });
        } else {
            build.files.push(OutputFile {
                file_name: artifact.file_name.clone(),
                contents,
            });
        }

        build.artifacts.push(artifact);
    }

    build.files.push(OutputFile {
        file_name: MANIFEST_FILE.to_string(),
        contents: manifest_json(&build.artifacts).into_bytes(),
    });

    Ok(build)
}
