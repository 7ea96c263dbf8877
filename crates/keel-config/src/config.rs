//! High-level configuration structure for Keel.
//!
//! This module provides the main `KeelConfig` struct and profile merging logic.
//! For file discovery, see the `discovery` module.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::alias::AliasRule;
use crate::error::{ConfigError, Result as ConfigResult};

/// Schema version understood by this release.
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeelConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Project root, relative to the directory holding the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Public base path the build is served under (e.g. "/ShiningSword/")
    #[serde(default = "default_base")]
    pub base: String,

    #[serde(default)]
    pub resolve: ResolveOptions,

    #[serde(default)]
    pub build: BuildOptions,

    #[serde(default)]
    pub server: ServerOptions,

    /// Literal constants substituted into compiled output
    #[serde(default)]
    pub define: IndexMap<String, Value>,

    #[serde(default)]
    pub env: EnvOptions,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub profiles: IndexMap<String, ProfileConfig>,
}

impl Default for KeelConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            root: None,
            base: default_base(),
            resolve: ResolveOptions::default(),
            build: BuildOptions::default(),
            server: ServerOptions::default(),
            define: IndexMap::new(),
            env: EnvOptions::default(),
            profiles: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveOptions {
    #[serde(default)]
    pub alias: AliasDecls,
}

/// Alias declarations.
///
/// Accepts either an ordered list of `{ find, replacement }` rules or a
/// table of `find = replacement` pairs. Both keep declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasDecls {
    List(Vec<AliasDecl>),
    Table(IndexMap<String, PathBuf>),
}

impl Default for AliasDecls {
    fn default() -> Self {
        AliasDecls::List(Vec::new())
    }
}

impl AliasDecls {
    pub fn is_empty(&self) -> bool {
        match self {
            AliasDecls::List(list) => list.is_empty(),
            AliasDecls::Table(table) => table.is_empty(),
        }
    }

    /// Flatten into rules in declaration order.
    pub fn to_rules(&self) -> Vec<AliasRule> {
        match self {
            AliasDecls::List(list) => list
                .iter()
                .map(|decl| AliasRule::new(&decl.find, &decl.replacement))
                .collect(),
            AliasDecls::Table(table) => table
                .iter()
                .map(|(find, replacement)| AliasRule::new(find, replacement))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasDecl {
    pub find: String,
    pub replacement: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    /// Output directory, relative to the project root
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Purge the output directory before writing new artifacts
    #[serde(default = "default_true")]
    pub empty_out_dir: bool,

    #[serde(default)]
    pub sourcemap: bool,

    /// Include a content hash in artifact file names
    #[serde(default)]
    pub hash: bool,

    /// Named entry points: name -> source file relative to the project root
    #[serde(default)]
    pub entries: IndexMap<String, PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            empty_out_dir: true,
            sourcemap: false,
            hash: false,
            entries: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerOptions {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Proxy rules keyed by path pattern, evaluated in declaration order
    #[serde(default)]
    pub proxy: IndexMap<String, ProxyDecl>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            proxy: IndexMap::new(),
        }
    }
}

/// A proxy declaration: either a bare target URL or a full options table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyDecl {
    Target(String),
    Options(ProxyOptions),
}

impl ProxyDecl {
    pub fn into_options(self) -> ProxyOptions {
        match self {
            ProxyDecl::Target(target) => ProxyOptions {
                target,
                ..ProxyOptions::default()
            },
            ProxyDecl::Options(options) => options,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyOptions {
    pub target: String,

    /// Rewrite Host/Origin to the target so the backend sees a same-origin request
    #[serde(default)]
    pub change_origin: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<PathRewrite>,

    /// Extra headers added to every forwarded request
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
}

/// Replace a leading `from` path prefix with `to` before forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRewrite {
    pub from: String,
    #[serde(default)]
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvOptions {
    #[serde(default)]
    pub mode: CaptureModeDecl,

    /// Variables captured in allow-list mode
    #[serde(default)]
    pub keys: Vec<String>,

    /// Variables never captured, even in `all` mode
    #[serde(default)]
    pub deny: Vec<String>,

    /// Layer `.env` and `.env.<mode>` files from the project root
    #[serde(default = "default_true")]
    pub dotenv: bool,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            mode: CaptureModeDecl::AllowList,
            keys: Vec::new(),
            deny: Vec::new(),
            dotenv: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureModeDecl {
    #[default]
    AllowList,
    All,
}

/// A named delta merged onto the base configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileConfig(pub Value);

impl KeelConfig {
    /// Create from serde_json::Value (for programmatic config)
    ///
    /// # Example
    ///
    /// ```
    /// use keel_config::KeelConfig;
    /// use serde_json::json;
    ///
    /// let value = json!({
    ///     "build": {
    ///         "outDir": "publish",
    ///         "entries": { "main": "main.js" }
    ///     }
    /// });
    ///
    /// let config = KeelConfig::from_value(value).unwrap();
    /// assert_eq!(config.build.out_dir, std::path::PathBuf::from("publish"));
    /// ```
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Merge the named profile onto the base configuration.
    ///
    /// Objects merge key by key; arrays and scalars in the profile replace the
    /// base value. `None` returns the configuration unchanged.
    pub fn materialize_profile(mut self, profile: Option<&str>) -> ConfigResult<Self> {
        let Some(name) = profile else {
            return Ok(self);
        };

        let delta = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;

        if delta.0.is_null() {
            return Ok(self);
        }

        let Value::Object(delta_map) = &delta.0 else {
            return Err(ConfigError::InvalidProfileOverride {
                message: format!("profile '{name}' must be a table"),
            });
        };

        for key in ["version", "profiles"] {
            if delta_map.contains_key(key) {
                return Err(ConfigError::InvalidProfileOverride {
                    message: format!("profile '{name}' cannot override '{key}'"),
                });
            }
        }

        let profiles = std::mem::take(&mut self.profiles);
        let mut base =
            serde_json::to_value(&self).map_err(|err| ConfigError::InvalidProfileOverride {
                message: err.to_string(),
            })?;
        merge_values(&mut base, &delta.0);

        let mut merged: KeelConfig =
            serde_json::from_value(base).map_err(|err| ConfigError::InvalidProfileOverride {
                message: err.to_string(),
            })?;
        merged.profiles = profiles;
        Ok(merged)
    }
}

fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_base() -> String {
    "/".to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5173
}
