//! File-based config discovery for CLI use
//!
//! Handles finding and loading Keel configuration files from the filesystem.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

use crate::config::KeelConfig;
use crate::error::{ConfigError, Result};

/// Config file names, in lookup order.
pub const CONFIG_FILES: [&str; 2] = ["keel.toml", "keel.json"];

const PACKAGE_JSON: &str = "package.json";
const PACKAGE_FIELD: &str = "keel";

/// File-based configuration discovery
///
/// Searches a project directory for a Keel configuration and loads it.
/// Library users should use `KeelConfig::from_value()` directly.
///
/// # Example
///
/// ```no_run
/// use keel_config::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// let config = discovery.load().unwrap();
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Find a config file in the root directory
    ///
    /// Searches in this order:
    /// 1. keel.toml
    /// 2. keel.json
    /// 3. package.json (keel field)
    pub fn find(&self) -> Option<PathBuf> {
        for name in CONFIG_FILES {
            let path = self.root.join(name);
            if path.is_file() {
                return Some(path);
            }
        }

        let pkg_path = self.root.join(PACKAGE_JSON);
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed = serde_json::from_str::<Value>(&content).ok()?;
        match parsed.get(PACKAGE_FIELD) {
            Some(value) if !value.is_null() => Some(pkg_path),
            _ => None,
        }
    }

    /// Load config from discovered file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config file is found.
    pub fn load(&self) -> Result<KeelConfig> {
        let path = self.find().ok_or(ConfigError::NotFound)?;
        tracing::debug!(path = %path.display(), "discovered config file");
        load_file(&path)
    }

    /// Load config with profile merging
    pub fn load_with_profile(&self, profile: &str) -> Result<KeelConfig> {
        self.load()?.materialize_profile(Some(profile))
    }
}

/// Load a config file by path, choosing the parser from its name.
///
/// # Errors
///
/// Returns `ConfigError::UnsupportedFormat` for anything other than
/// `.toml`, `.json` or a `package.json` with a `keel` field.
pub fn load_file(path: &Path) -> Result<KeelConfig> {
    let value = load_value(path)?;
    KeelConfig::from_value(value)
}

fn load_value(path: &Path) -> Result<Value> {
    if path.file_name() == Some(std::ffi::OsStr::new(PACKAGE_JSON)) {
        return load_package_json(path);
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => {
            let content = fs::read_to_string(path)?;
            let toml_val: toml::Value =
                toml::from_str(&content).map_err(|e| ConfigError::InvalidValue {
                    field: "toml".to_string(),
                    hint: Some(format!("Invalid TOML syntax: {e}")),
                })?;
            serde_json::to_value(toml_val).map_err(|e| ConfigError::InvalidValue {
                field: "toml".to_string(),
                hint: Some(format!("TOML to JSON conversion failed: {e}")),
            })
        }
        Some("json") => {
            let content = fs::read_to_string(path)?;
            reject_duplicate_keys(&content, &[])?;
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidValue {
                field: "json".to_string(),
                hint: Some(format!("Invalid JSON: {e}")),
            })
        }
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or_default().to_string(),
        )),
    }
}

fn load_package_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    reject_duplicate_keys(&content, &[PACKAGE_FIELD])?;

    let mut parsed: Value = serde_json::from_str(&content).map_err(|e| ConfigError::InvalidValue {
        field: PACKAGE_JSON.to_string(),
        hint: Some(format!("Invalid JSON: {e}")),
    })?;

    match parsed.get_mut(PACKAGE_FIELD).map(Value::take) {
        Some(Value::Null) => Err(ConfigError::InvalidValue {
            field: PACKAGE_FIELD.to_string(),
            hint: Some("The 'keel' field cannot be null".to_string()),
        }),
        Some(value) => Ok(value),
        None => Err(ConfigError::InvalidValue {
            field: PACKAGE_FIELD.to_string(),
            hint: Some("Add a 'keel' field to your package.json".to_string()),
        }),
    }
}

/// Fail on the first object key repeated inside the config body.
///
/// JSON objects keep only the last of several equal keys once parsed, so a
/// second `main` entry or proxy pattern would silently replace the first.
/// The raw text is scanned before parsing to catch that. `prefix` selects
/// the config body inside a larger document (`keel` in package.json); keys
/// repeated outside it are ignored. TOML rejects repeated keys itself.
fn reject_duplicate_keys(content: &str, prefix: &[&str]) -> Result<()> {
    let mut found = Vec::new();
    let mut de = serde_json::Deserializer::from_str(content);
    KeyScan {
        path: Vec::new(),
        found: &mut found,
    }
    .deserialize(&mut de)
    .map_err(|e| ConfigError::InvalidValue {
        field: "json".to_string(),
        hint: Some(format!("Invalid JSON: {e}")),
    })?;

    let body = found.into_iter().find_map(|(path, key)| {
        let inside = path.len() >= prefix.len() && path.iter().zip(prefix).all(|(a, b)| a == b);
        inside.then(|| (path[prefix.len()..].to_vec(), key))
    });

    match body {
        Some((path, key)) => Err(duplicate_key_error(&path, key)),
        None => Ok(()),
    }
}

fn duplicate_key_error(path: &[String], key: String) -> ConfigError {
    let tail: Vec<&str> = path[path.len().saturating_sub(2)..].iter().map(String::as_str).collect();
    match tail.as_slice() {
        ["build", "entries"] => ConfigError::DuplicateEntry(key),
        ["server", "proxy"] => ConfigError::MalformedProxy {
            pattern: key,
            message: "pattern is declared more than once".to_string(),
        },
        _ => {
            let mut field = path.to_vec();
            field.push(key);
            ConfigError::InvalidValue {
                field: field.join("."),
                hint: Some("key is declared more than once".to_string()),
            }
        }
    }
}

/// Walks a JSON document recording `(object path, key)` for repeated keys.
struct KeyScan<'a> {
    path: Vec<String>,
    found: &'a mut Vec<(Vec<String>, String)>,
}

impl<'de> DeserializeSeed<'de> for KeyScan<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for KeyScan<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        let KeyScan { path, found } = self;
        let mut index = 0usize;
        loop {
            let mut child = path.clone();
            child.push(index.to_string());
            let seed = KeyScan {
                path: child,
                found: &mut *found,
            };
            if seq.next_element_seed(seed)?.is_none() {
                return Ok(());
            }
            index += 1;
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        let KeyScan { path, found } = self;
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            if !seen.insert(key.clone()) {
                found.push((path.clone(), key.clone()));
            }
            let mut child = path.clone();
            child.push(key);
            map.next_value_seed(KeyScan {
                path: child,
                found: &mut *found,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn find_returns_none_when_no_config() {
        let dir = TempDir::new().unwrap();
        let discovery = ConfigDiscovery::new(dir.path());
        assert!(discovery.find().is_none());
    }

    #[test]
    fn toml_takes_precedence_over_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("keel.json"), "{}").unwrap();
        fs::write(dir.path().join("keel.toml"), "").unwrap();

        let discovery = ConfigDiscovery::new(dir.path());
        assert_eq!(discovery.find().unwrap(), dir.path().join("keel.toml"));
    }

    #[test]
    fn load_returns_not_found_when_no_config() {
        let dir = TempDir::new().unwrap();
        let result = ConfigDiscovery::new(dir.path()).load();
        assert!(matches!(result.unwrap_err(), ConfigError::NotFound));
    }

    #[test]
    fn load_parses_toml_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("keel.toml"),
            r#"
root = "src/ShiningSword"
base = "/ShiningSword/"

[build]
outDir = "publish"
sourcemap = true

[build.entries]
main = "main.js"
sandbox = "sandbox/main.js"
"#,
        )
        .unwrap();

        let config = ConfigDiscovery::new(dir.path()).load().unwrap();
        assert_eq!(config.root, Some(PathBuf::from("src/ShiningSword")));
        assert_eq!(config.base, "/ShiningSword/");
        assert_eq!(config.build.out_dir, PathBuf::from("publish"));
        let names: Vec<_> = config.build.entries.keys().cloned().collect();
        assert_eq!(names, vec!["main", "sandbox"]);
    }

    #[test]
    fn load_from_package_json() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{
                "name": "test",
                "keel": {
                    "build": { "entries": { "main": "index.js" } }
                }
            }"#,
        )
        .unwrap();

        let config = ConfigDiscovery::new(dir.path()).load().unwrap();
        assert_eq!(config.build.entries["main"], PathBuf::from("index.js"));
    }

    #[test]
    fn package_json_without_field_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{ "name": "test" }"#).unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
    }

    #[test]
    fn repeated_entry_in_json_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keel.json");
        fs::write(&path, r#"{"build":{"entries":{"main":"a.js","main":"b.js"}}}"#).unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEntry(name) if name == "main"));
    }

    #[test]
    fn repeated_keys_in_profiles_and_other_tables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keel.json");

        fs::write(
            &path,
            r#"{"profiles":{"production":{"build":{"entries":{"x":"a.js","x":"b.js"}}}}}"#,
        )
        .unwrap();
        assert!(matches!(load_file(&path).unwrap_err(), ConfigError::DuplicateEntry(_)));

        fs::write(&path, r#"{"define":{"__A__":"1","__A__":"2"}}"#).unwrap();
        assert!(matches!(
            load_file(&path).unwrap_err(),
            ConfigError::InvalidValue { field, .. } if field == "define.__A__"
        ));
    }

    #[test]
    fn package_json_only_checks_keel_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        fs::write(
            &path,
            r#"{
                "scripts": { "dev": "a", "dev": "b" },
                "keel": { "server": { "proxy": { "/api": "http://a", "/api": "http://b" } } }
            }"#,
        )
        .unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedProxy { pattern, .. } if pattern == "/api"));
    }

    #[test]
    fn repeated_key_in_toml_is_a_syntax_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keel.toml");
        fs::write(&path, "[build.entries]\nmain = \"a.js\"\nmain = \"b.js\"\n").unwrap();
        assert!(load_file(&path).unwrap_err().to_string().contains("Invalid TOML syntax"));
    }

    #[test]
    fn invalid_toml_reports_syntax() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("keel.toml"), "[build\n").unwrap();
        let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("Invalid TOML syntax"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keel.yaml");
        fs::write(&path, "build: {}").unwrap();
        assert!(matches!(
            load_file(&path).unwrap_err(),
            ConfigError::UnsupportedFormat(ext) if ext == "yaml"
        ));
    }
}
