//! One-shot configuration load.
//!
//! Runs every component in a fixed order and stops at the first failure:
//! profile overlay, validation, aliases, entries, environment snapshot,
//! output plan, proxy table. The result is read-only and cheap to share.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::alias::AliasResolver;
use crate::config::{CaptureModeDecl, KeelConfig};
use crate::entries::EntryPointRegistry;
use crate::env::{Builtins, CaptureMode, DotenvEnv, EnvSnapshot, EnvSource, EnvironmentSnapshotInjector};
use crate::error::Result;
use crate::output::{BuildOutputConfig, BuildOutputPlanner};
use crate::proxy::DevProxyRouter;
use crate::validation::{ConfigValidator, FsValidator, SchemaValidator};

/// Inputs to [`ResolvedConfig::load`] that do not come from the config file.
pub struct LoadContext<'a> {
    /// Directory holding the config file; `root` resolves against it
    pub config_dir: &'a Path,
    /// Build mode exposed as `MODE` and used to pick `.env.<mode>` files
    pub mode: &'a str,
    /// Profile to overlay before validation
    pub profile: Option<&'a str>,
    pub env: &'a dyn EnvSource,
    /// Require every entry source to exist on disk
    pub check_entries: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    root: PathBuf,
    base: String,
    mode: String,
    host: String,
    port: u16,
    aliases: AliasResolver,
    entries: EntryPointRegistry,
    injector: EnvironmentSnapshotInjector,
    output: BuildOutputConfig,
    proxy: DevProxyRouter,
}

impl ResolvedConfig {
    /// Resolve `config` into its runtime form.
    ///
    /// # Errors
    ///
    /// Any configuration error aborts the load; nothing is partially applied.
    pub fn load(config: KeelConfig, ctx: &LoadContext<'_>) -> Result<Self> {
        let config = config.materialize_profile(ctx.profile)?;

        let config_dir = std::path::absolute(ctx.config_dir)?;
        let root = match &config.root {
            Some(root) => config_dir.join(root).clean(),
            None => config_dir.clean(),
        };

        if ctx.check_entries {
            FsValidator::new(&root).validate(&config)?;
        } else {
            SchemaValidator.validate(&config)?;
        }

        let aliases = AliasResolver::anchored(config.resolve.alias.to_rules(), &root);

        let mut entries = EntryPointRegistry::new();
        for (name, source) in &config.build.entries {
            entries.register(name.clone(), source.clone())?;
        }

        let capture = capture_mode(&config);
        let builtins = Builtins {
            mode: ctx.mode.to_string(),
            base_url: config.base.clone(),
        };
        let snapshot = if config.env.dotenv {
            let layered = DotenvEnv::load(&root, ctx.mode, ctx.env)?;
            EnvSnapshot::capture_with_builtins(&capture, &layered, &builtins)
        } else {
            EnvSnapshot::capture_with_builtins(&capture, ctx.env, &builtins)
        };
        let injector = EnvironmentSnapshotInjector::new(snapshot, config.define.clone())?;

        let output = BuildOutputPlanner::new(&root).plan(&entries, &config.build)?;

        let proxy = DevProxyRouter::from_decls(
            config
                .server
                .proxy
                .into_iter()
                .map(|(pattern, decl)| (pattern, decl.into_options())),
        )?;

        tracing::debug!(
            root = %root.display(),
            mode = ctx.mode,
            entries = entries.len(),
            aliases = aliases.rules().len(),
            proxies = proxy.rules().len(),
            "configuration resolved"
        );

        Ok(Self {
            root,
            base: config.base,
            mode: ctx.mode.to_string(),
            host: config.server.host,
            port: config.server.port,
            aliases,
            entries,
            injector,
            output,
            proxy,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn aliases(&self) -> &AliasResolver {
        &self.aliases
    }

    pub fn entries(&self) -> &EntryPointRegistry {
        &self.entries
    }

    pub fn snapshot(&self) -> &EnvSnapshot {
        self.injector.snapshot()
    }

    pub fn injector(&self) -> &EnvironmentSnapshotInjector {
        &self.injector
    }

    pub fn output(&self) -> &BuildOutputConfig {
        &self.output
    }

    pub fn proxy(&self) -> &DevProxyRouter {
        &self.proxy
    }
}

fn capture_mode(config: &KeelConfig) -> CaptureMode {
    match config.env.mode {
        CaptureModeDecl::AllowList => CaptureMode::allow_list(config.env.keys.iter().cloned()),
        CaptureModeDecl::All => CaptureMode::All {
            deny: config.env.deny.iter().cloned().collect::<BTreeSet<_>>(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;
    use serde_json::json;

    fn ctx<'a>(dir: &'a Path, env: &'a MapEnv) -> LoadContext<'a> {
        LoadContext {
            config_dir: dir,
            mode: "development",
            profile: None,
            env,
            check_entries: false,
        }
    }

    #[test]
    fn root_resolves_against_config_dir() {
        let config = KeelConfig::from_value(json!({
            "root": "src/ShiningSword",
            "build": { "entries": { "main": "main.js" } }
        }))
        .unwrap();
        let env = MapEnv::new();
        let resolved = ResolvedConfig::load(config, &ctx(Path::new("/work"), &env)).unwrap();

        assert_eq!(resolved.root(), Path::new("/work/src/ShiningSword"));
        assert_eq!(
            resolved.output().out_dir,
            PathBuf::from("/work/src/ShiningSword/dist")
        );
    }

    #[test]
    fn snapshot_is_shared_not_resampled() {
        let config = KeelConfig::from_value(json!({
            "build": { "entries": { "main": "main.js" } },
            "env": { "keys": ["API_URL"], "dotenv": false }
        }))
        .unwrap();
        let env = MapEnv::from_iter([("API_URL", "x")]);
        let resolved = ResolvedConfig::load(config, &ctx(Path::new("/work"), &env)).unwrap();

        let a = resolved.snapshot().clone();
        let b = resolved.injector().snapshot().clone();
        assert!(a.same_capture(&b));
        assert_eq!(a.get("API_URL"), Some("x"));
        assert_eq!(a.get("MODE"), Some("development"));
    }

    #[test]
    fn first_failure_aborts_load() {
        let config = KeelConfig::from_value(json!({
            "build": { "entries": { "main": "main.js" }, "outDir": "../outside" },
            "server": { "proxy": { "/api": "http://localhost:5000" } }
        }))
        .unwrap();
        let env = MapEnv::new();
        let err = ResolvedConfig::load(config, &ctx(Path::new("/work"), &env)).unwrap_err();
        assert!(matches!(err, crate::ConfigError::InvalidOutputDirectory { .. }));
    }
}
