//! Named build targets.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub source: PathBuf,
}

/// Ordered set of entry points with unique names.
///
/// Registration order is the enumeration order, which keeps build logs and
/// manifests deterministic.
#[derive(Debug, Clone, Default)]
pub struct EntryPointRegistry {
    entries: Vec<EntryPoint>,
}

impl EntryPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry point.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateEntry` if `name` is already registered
    /// and `ConfigError::InvalidEntryName` if it cannot be used as a file stem.
    pub fn register(&mut self, name: impl Into<String>, source: impl Into<PathBuf>) -> Result<()> {
        let name = name.into();
        if !is_valid_entry_name(&name) {
            return Err(ConfigError::InvalidEntryName(name));
        }
        if self.get(&name).is_some() {
            return Err(ConfigError::DuplicateEntry(name));
        }
        self.entries.push(EntryPoint {
            name,
            source: source.into(),
        });
        Ok(())
    }

    /// Iterate `(name, source)` pairs in registration order.
    ///
    /// Each call starts a fresh iteration.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Path)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.source.as_path()))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntryPoint> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&EntryPoint> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a EntryPointRegistry {
    type Item = &'a EntryPoint;
    type IntoIter = std::slice::Iter<'a, EntryPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub(crate) fn is_valid_entry_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = EntryPointRegistry::new();
        registry.register("main", "src/main.js").unwrap();

        let err = registry.register("main", "src/other.js").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEntry(name) if name == "main"));
        // the original registration is untouched
        assert_eq!(
            registry.get("main").unwrap().source,
            PathBuf::from("src/main.js")
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_names_are_both_retrievable() {
        let mut registry = EntryPointRegistry::new();
        registry.register("main", "src/main.js").unwrap();
        registry.register("sandbox", "sandbox/main.js").unwrap();

        assert!(registry.get("main").is_some());
        assert!(registry.get("sandbox").is_some());
    }

    #[test]
    fn entries_are_restartable_and_ordered() {
        let mut registry = EntryPointRegistry::new();
        registry.register("b", "b.js").unwrap();
        registry.register("a", "a.js").unwrap();

        let first: Vec<_> = registry.entries().map(|(name, _)| name).collect();
        let second: Vec<_> = registry.entries().map(|(name, _)| name).collect();
        assert_eq!(first, vec!["b", "a"]);
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_names_that_are_not_file_stems() {
        let mut registry = EntryPointRegistry::new();
        for bad in ["", "..", "a/b", "main app"] {
            assert!(matches!(
                registry.register(bad, "x.js"),
                Err(ConfigError::InvalidEntryName(_))
            ));
        }
        assert!(registry.is_empty());
    }
}
