//! Pluggable config validation strategies
//!
//! Separates filesystem validation (for CLI use) from schema validation (for library use).

use std::path::{Path, PathBuf};

use crate::config::{CURRENT_VERSION, KeelConfig};
use crate::entries::is_valid_entry_name;
use crate::env::shadows_env_reference;
use crate::error::{ConfigError, Result};
use crate::proxy::ProxyRule;

/// Trait for pluggable config validation strategies
pub trait ConfigValidator {
    fn validate(&self, config: &KeelConfig) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// # Example
///
/// ```
/// use keel_config::{ConfigValidator, KeelConfig, SchemaValidator};
///
/// let mut config = KeelConfig::default();
/// config.build.entries.insert("main".into(), "main.js".into());
///
/// SchemaValidator.validate(&config).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &KeelConfig) -> Result<()> {
        if config.version != CURRENT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                expected: CURRENT_VERSION,
            });
        }

        if !config.base.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "base".to_string(),
                hint: Some(format!("'{}' must start with '/'", config.base)),
            });
        }

        if config.build.entries.is_empty() {
            return Err(ConfigError::NoEntries);
        }

        for (name, source) in &config.build.entries {
            if !is_valid_entry_name(name) {
                return Err(ConfigError::InvalidEntryName(name.clone()));
            }
            if source.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("build.entries.{name}"),
                    hint: Some("entry source cannot be empty".to_string()),
                });
            }
        }

        for (index, rule) in config.resolve.alias.to_rules().iter().enumerate() {
            if rule.find().is_empty() {
                return Err(ConfigError::MalformedAlias {
                    index,
                    message: "'find' cannot be empty".to_string(),
                });
            }
            if rule.replacement().is_empty() {
                return Err(ConfigError::MalformedAlias {
                    index,
                    message: format!("replacement for '{}' cannot be empty", rule.find()),
                });
            }
        }

        for (pattern, decl) in &config.server.proxy {
            ProxyRule::new(pattern, decl.clone().into_options())?;
        }

        for key in config.define.keys() {
            if !is_define_key(key) {
                return Err(ConfigError::InvalidValue {
                    field: format!("define.{key}"),
                    hint: Some("define keys must be identifiers or dotted identifier paths".to_string()),
                });
            }
            if shadows_env_reference(key) {
                return Err(ConfigError::InvalidValue {
                    field: format!("define.{key}"),
                    hint: Some("define keys cannot replace part of import.meta.env or process.env".to_string()),
                });
            }
        }

        if config.env.keys.iter().any(|key| key.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "env.keys".to_string(),
                hint: Some("remove empty variable names".to_string()),
            });
        }

        Ok(())
    }
}

fn is_define_key(key: &str) -> bool {
    !key.is_empty()
        && key.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

/// Filesystem validator (for CLI use)
///
/// Runs schema validation, then checks that every entry source exists under
/// the project root.
pub struct FsValidator {
    root: PathBuf,
}

impl FsValidator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &KeelConfig) -> Result<()> {
        SchemaValidator.validate(config)?;

        for source in config.build.entries.values() {
            let path = self.root.join(source);
            if !path.is_file() {
                return Err(ConfigError::EntryNotFound { path });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AliasDecl, AliasDecls, ProxyDecl};

    fn valid() -> KeelConfig {
        let mut config = KeelConfig::default();
        config.build.entries.insert("main".into(), PathBuf::from("main.js"));
        config
    }

    #[test]
    fn schema_validator_rejects_empty_entries() {
        let result = SchemaValidator.validate(&KeelConfig::default());
        assert!(matches!(result.unwrap_err(), ConfigError::NoEntries));
    }

    #[test]
    fn schema_validator_accepts_valid_config() {
        assert!(SchemaValidator.validate(&valid()).is_ok());
    }

    #[test]
    fn rejects_future_version() {
        let mut config = valid();
        config.version = 2;
        assert!(matches!(
            SchemaValidator.validate(&config).unwrap_err(),
            ConfigError::UnsupportedVersion { found: 2, .. }
        ));
    }

    #[test]
    fn rejects_empty_alias_find() {
        let mut config = valid();
        config.resolve.alias = AliasDecls::List(vec![
            AliasDecl {
                find: "@".into(),
                replacement: "src".into(),
            },
            AliasDecl {
                find: String::new(),
                replacement: "lib".into(),
            },
        ]);
        assert!(matches!(
            SchemaValidator.validate(&config).unwrap_err(),
            ConfigError::MalformedAlias { index: 1, .. }
        ));
    }

    #[test]
    fn rejects_malformed_proxy() {
        let mut config = valid();
        config
            .server
            .proxy
            .insert("/api".into(), ProxyDecl::Target("localhost:5000/api".into()));
        assert!(matches!(
            SchemaValidator.validate(&config).unwrap_err(),
            ConfigError::MalformedProxy { .. }
        ));
    }

    #[test]
    fn rejects_invalid_define_key() {
        let mut config = valid();
        config.define.insert("not valid".into(), serde_json::json!(1));
        assert!(SchemaValidator.validate(&config).is_err());

        let mut config = valid();
        config.define.insert("import.meta.env.FLAG".into(), serde_json::json!(true));
        assert!(SchemaValidator.validate(&config).is_ok());
    }

    #[test]
    fn rejects_define_key_covering_env_reference() {
        for key in ["process", "process.env", "import", "import.meta", "import.meta.env"] {
            let mut config = valid();
            config.define.insert(key.into(), serde_json::json!("{}"));
            assert!(
                matches!(
                    SchemaValidator.validate(&config).unwrap_err(),
                    ConfigError::InvalidValue { ref field, .. } if field == &format!("define.{key}")
                ),
                "{key}"
            );
        }
    }

    #[test]
    fn rejects_relative_base() {
        let mut config = valid();
        config.base = "ShiningSword/".into();
        assert!(SchemaValidator.validate(&config).is_err());
    }

    #[test]
    fn fs_validator_checks_entry_sources() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = valid();
        assert!(matches!(
            FsValidator::new(dir.path()).validate(&config).unwrap_err(),
            ConfigError::EntryNotFound { .. }
        ));

        std::fs::write(dir.path().join("main.js"), "export {}").unwrap();
        assert!(FsValidator::new(dir.path()).validate(&config).is_ok());
    }
}
