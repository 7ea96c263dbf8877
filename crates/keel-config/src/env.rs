//! Build-time environment snapshots and constant substitution.
//!
//! The environment is sampled exactly once per configuration load into an
//! [`EnvSnapshot`]. Compiled output then has every `import.meta.env.NAME` /
//! `process.env.NAME` reference and every `define` key replaced by literal
//! values, so shipped artifacts carry constants instead of runtime lookups.
//!
//! # Capture modes
//!
//! [`CaptureMode::AllowList`] is the default and only records the variables
//! the project names. [`CaptureMode::All`] records the whole environment,
//! which bakes user names, absolute paths and anything secret on the build
//! machine into the artifact; it is opt-in and logged at warn level.
//!
//! # Example
//!
//! ```
//! use keel_config::{CaptureMode, EnvSnapshot, EnvironmentSnapshotInjector, MapEnv};
//!
//! let source = MapEnv::from_iter([("API_URL", "https://api.example.com")]);
//! let snapshot = EnvSnapshot::capture(&CaptureMode::allow_list(["API_URL"]), &source);
//! let injector = EnvironmentSnapshotInjector::new(snapshot, Default::default()).unwrap();
//!
//! let out = injector.substitute("fetch(import.meta.env.API_URL)").unwrap();
//! assert_eq!(out, r#"fetch("https://api.example.com")"#);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::{ConfigError, Result};

/// Where environment values come from.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Every variable the source knows about.
    fn vars(&self) -> Vec<(String, String)>;
}

impl<T: EnvSource + ?Sized> EnvSource for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn vars(&self) -> Vec<(String, String)> {
        (**self).vars()
    }
}

/// The current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn vars(&self) -> Vec<(String, String)> {
        // non-UTF-8 values cannot be inlined as JS strings
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

/// An explicit set of variables (tests, secret stores).
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// `.env` files layered underneath another source.
///
/// Files are read in increasing priority: `.env`, `.env.local`,
/// `.env.<mode>`, `.env.<mode>.local`. Values from the wrapped source always
/// win over file values.
#[derive(Debug, Clone)]
pub struct DotenvEnv<S> {
    files: BTreeMap<String, String>,
    inner: S,
}

impl<S: EnvSource> DotenvEnv<S> {
    pub fn load(root: &Path, mode: &str, inner: S) -> Result<Self> {
        let mut files = BTreeMap::new();
        let candidates = [
            ".env".to_string(),
            ".env.local".to_string(),
            format!(".env.{mode}"),
            format!(".env.{mode}.local"),
        ];

        for name in candidates {
            let path = root.join(&name);
            if !path.is_file() {
                continue;
            }
            let iter = dotenvy::from_path_iter(&path).map_err(|e| dotenv_error(&name, e))?;
            for item in iter {
                let (key, value) = item.map_err(|e| dotenv_error(&name, e))?;
                files.insert(key, value);
            }
            tracing::debug!(file = %path.display(), "loaded env file");
        }

        Ok(Self { files, inner })
    }
}

fn dotenv_error(file: &str, err: dotenvy::Error) -> ConfigError {
    ConfigError::InvalidValue {
        field: file.to_string(),
        hint: Some(err.to_string()),
    }
}

impl<S: EnvSource> EnvSource for DotenvEnv<S> {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).or_else(|| self.files.get(key).cloned())
    }

    fn vars(&self) -> Vec<(String, String)> {
        let mut merged = self.files.clone();
        merged.extend(self.inner.vars());
        merged.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureMode {
    /// Record only the named variables.
    AllowList(BTreeSet<String>),
    /// Record the whole environment except the denied names.
    All { deny: BTreeSet<String> },
}

impl CaptureMode {
    pub fn allow_list<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CaptureMode::AllowList(keys.into_iter().map(Into::into).collect())
    }
}

impl Default for CaptureMode {
    fn default() -> Self {
        CaptureMode::AllowList(BTreeSet::new())
    }
}

/// Values every snapshot carries regardless of capture mode.
#[derive(Debug, Clone)]
pub struct Builtins {
    pub mode: String,
    pub base_url: String,
}

impl Builtins {
    fn vars(&self) -> [(&'static str, String); 4] {
        let prod = self.mode == "production";
        [
            ("MODE", self.mode.clone()),
            ("BASE_URL", self.base_url.clone()),
            ("DEV", (!prod).to_string()),
            ("PROD", prod.to_string()),
        ]
    }
}

/// Immutable, point-in-time capture of environment values.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: Arc<BTreeMap<String, String>>,
}

impl EnvSnapshot {
    /// Sample `source` once according to `mode`.
    pub fn capture(mode: &CaptureMode, source: &dyn EnvSource) -> Self {
        Self::from_map(capture_map(mode, source))
    }

    /// Sample `source` and add the builtin `MODE`/`BASE_URL`/`DEV`/`PROD` values.
    pub fn capture_with_builtins(
        mode: &CaptureMode,
        source: &dyn EnvSource,
        builtins: &Builtins,
    ) -> Self {
        let mut vars = capture_map(mode, source);
        for (key, value) in builtins.vars() {
            vars.insert(key.to_string(), value);
        }
        Self::from_map(vars)
    }

    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self {
            vars: Arc::new(vars),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when both handles point at the same capture.
    pub fn same_capture(&self, other: &EnvSnapshot) -> bool {
        Arc::ptr_eq(&self.vars, &other.vars)
    }

    fn to_json_object(&self) -> Value {
        Value::Object(
            self.vars
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

fn capture_map(mode: &CaptureMode, source: &dyn EnvSource) -> BTreeMap<String, String> {
    match mode {
        CaptureMode::AllowList(keys) => {
            let vars: BTreeMap<_, _> = keys
                .iter()
                .filter_map(|key| source.get(key).map(|value| (key.clone(), value)))
                .collect();
            tracing::debug!(requested = keys.len(), captured = vars.len(), "captured env allow-list");
            vars
        }
        CaptureMode::All { deny } => {
            let vars: BTreeMap<_, _> = source
                .vars()
                .into_iter()
                .filter(|(key, _)| !deny.contains(key))
                .collect();
            tracing::warn!(
                captured = vars.len(),
                "capturing the entire build environment; machine paths, user names and secrets may be baked into the output"
            );
            vars
        }
    }
}

const ENV_REFERENCE: &str =
    r"(?:import\.meta\.env|process\.env)(?:\.(?P<name>[A-Za-z_][A-Za-z0-9_]*))?";

/// Leading parts of the environment reference forms.
const ENV_REFERENCE_PREFIXES: [&str; 5] = ["import", "import.meta", "import.meta.env", "process", "process.env"];

/// Whether a `define` key would swallow the start of an environment
/// reference, e.g. `process` in `process.env.API_URL`.
pub fn shadows_env_reference(key: &str) -> bool {
    ENV_REFERENCE_PREFIXES.contains(&key)
}

/// Substitutes snapshot values and `define` constants into compiled text.
///
/// Matching is textual: references inside string literals or comments are
/// replaced too, the same way bundler `define` replacement behaves.
#[derive(Debug, Clone)]
pub struct EnvironmentSnapshotInjector {
    snapshot: EnvSnapshot,
    defines: IndexMap<String, Value>,
    pattern: Regex,
}

impl EnvironmentSnapshotInjector {
    pub fn new(snapshot: EnvSnapshot, defines: IndexMap<String, Value>) -> Result<Self> {
        if let Some(key) = defines.keys().find(|key| shadows_env_reference(key)) {
            return Err(ConfigError::InvalidValue {
                field: format!("define.{key}"),
                hint: Some("define keys cannot replace part of import.meta.env or process.env".to_string()),
            });
        }

        let mut keys: Vec<&String> = defines.keys().collect();
        // longest first so `a.b.c` wins over `a.b`
        keys.sort_by_key(|key| std::cmp::Reverse(key.len()));

        let mut alternatives: Vec<String> = keys
            .into_iter()
            .map(|key| format!("(?:{})", regex::escape(key)))
            .collect();
        alternatives.push(format!("(?P<env>{ENV_REFERENCE})"));

        let pattern = Regex::new(&alternatives.join("|")).map_err(|e| ConfigError::InvalidValue {
            field: "define".to_string(),
            hint: Some(e.to_string()),
        })?;

        Ok(Self {
            snapshot,
            defines,
            pattern,
        })
    }

    pub fn snapshot(&self) -> &EnvSnapshot {
        &self.snapshot
    }

    pub fn defines(&self) -> &IndexMap<String, Value> {
        &self.defines
    }

    /// Replace every recognized reference in `source`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnresolvedVariable` naming the first referenced
    /// variable (in source order) that the snapshot does not contain.
    pub fn substitute(&self, source: &str) -> Result<String> {
        let mut out = String::with_capacity(source.len());
        let mut last = 0;

        for caps in self.pattern.captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if !at_identifier_boundary(source, whole.start(), whole.end()) {
                continue;
            }

            let replacement = if caps.name("env").is_some() {
                match caps.name("name") {
                    Some(name) => {
                        let name = name.as_str();
                        let value = self.snapshot.get(name).ok_or_else(|| {
                            ConfigError::UnresolvedVariable {
                                name: name.to_string(),
                            }
                        })?;
                        Value::String(value.to_string()).to_string()
                    }
                    None => self.snapshot.to_json_object().to_string(),
                }
            } else {
                match self.defines.get(whole.as_str()) {
                    Some(Value::String(expr)) => expr.clone(),
                    Some(other) => other.to_string(),
                    None => continue,
                }
            };

            out.push_str(&source[last..whole.start()]);
            out.push_str(&replacement);
            last = whole.end();
        }

        out.push_str(&source[last..]);
        Ok(out)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn at_identifier_boundary(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !is_ident_char(c) && c != '.');
    let after_ok = text[end..].chars().next().is_none_or(|c| !is_ident_char(c));
    before_ok && after_ok
}
