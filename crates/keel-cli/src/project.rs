//! Project loading for CLI commands.
//!
//! Values are layered lowest to highest: config file, selected profile,
//! `KEEL_`-prefixed environment variables, command-line flags. The config
//! body is parsed by `keel-config` so declared entry and proxy order
//! survives; figment only layers the scalar overrides on top.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use keel_config::{
    ConfigDiscovery, ConfigError, KeelConfig, LoadContext, ProcessEnv, ResolvedConfig, load_file,
};
use serde::{Deserialize, Serialize};

use crate::cli::ProjectArgs;
use crate::error::{CliError, Result, ResultExt};

/// Scalar settings that can be overridden from the environment or flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default)]
    pub build: BuildOverrides,
    #[serde(default)]
    pub server: ServerOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_out_dir: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Overrides {
    /// Merge `KEEL_*` environment variables under the given flag values.
    ///
    /// Nested keys use `__`, e.g. `KEEL_SERVER__PORT=3000` or
    /// `KEEL_BUILD__OUT_DIR=publish`.
    pub fn layered(flags: Overrides) -> Result<Self> {
        Figment::new()
            .merge(Env::prefixed("KEEL_").split("__"))
            .merge(Serialized::defaults(flags))
            .extract()
            .map_err(|e| CliError::InvalidArgument(format!("invalid KEEL_* override: {e}")))
    }

    pub fn apply(&self, config: &mut KeelConfig) {
        if let Some(base) = &self.base {
            config.base = base.clone();
        }
        if let Some(out_dir) = &self.build.out_dir {
            config.build.out_dir = out_dir.clone();
        }
        if let Some(empty_out_dir) = self.build.empty_out_dir {
            config.build.empty_out_dir = empty_out_dir;
        }
        if let Some(sourcemap) = self.build.sourcemap {
            config.build.sourcemap = sourcemap;
        }
        if let Some(hash) = self.build.hash {
            config.build.hash = hash;
        }
        if let Some(host) = &self.server.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.server.port {
            config.server.port = port;
        }
    }
}

/// A loaded and resolved project.
#[derive(Debug)]
pub struct Project {
    /// Config file the project was loaded from
    pub config_path: PathBuf,
    pub resolved: ResolvedConfig,
}

/// Options for [`load_project`] beyond the shared project flags.
pub struct LoadOptions<'a> {
    /// Profile applied when none is requested and the config declares it
    pub default_profile: &'a str,
    pub overrides: Overrides,
    pub check_entries: bool,
}

/// Locate, layer and resolve the project configuration.
pub fn load_project(args: &ProjectArgs, options: LoadOptions<'_>) -> Result<Project> {
    let (config_path, config) = read_config(args)?;
    let dir = config_dir(&config_path).to_path_buf();

    let (mode, profile) = select_profile(&config, args.profile.as_deref(), options.default_profile);
    tracing::debug!(config = %config_path.display(), mode = %mode, profile = ?profile, "loading project");

    let mut config = config.materialize_profile(profile.as_deref())?;
    Overrides::layered(options.overrides)?.apply(&mut config);

    let resolved = ResolvedConfig::load(
        config,
        &LoadContext {
            config_dir: &dir,
            mode: &mode,
            profile: None,
            env: &ProcessEnv,
            check_entries: options.check_entries,
        },
    )?;

    Ok(Project {
        config_path,
        resolved,
    })
}

fn read_config(args: &ProjectArgs) -> Result<(PathBuf, KeelConfig)> {
    if let Some(path) = &args.config {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            args.dir.join(path)
        };
        let config = load_file(&path).with_path(&path)?;
        return Ok((path, config));
    }

    let discovery = ConfigDiscovery::new(&args.dir);
    let path = discovery.find().ok_or(ConfigError::NotFound)?;
    let config = load_file(&path)?;
    Ok((path, config))
}

/// Pick the build mode and the profile to overlay.
///
/// An explicitly requested profile must exist; the command default is only
/// applied when the config declares it.
pub fn select_profile(
    config: &KeelConfig,
    requested: Option<&str>,
    default_profile: &str,
) -> (String, Option<String>) {
    match requested {
        Some(name) => (name.to_string(), Some(name.to_string())),
        None => (
            default_profile.to_string(),
            config
                .has_profile(default_profile)
                .then(|| default_profile.to_string()),
        ),
    }
}

/// Directory a config path resolves relative settings against.
pub fn config_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn project_args(dir: &Path) -> ProjectArgs {
        ProjectArgs {
            dir: dir.to_path_buf(),
            config: None,
            profile: None,
        }
    }

    fn write_project(dir: &Path) {
        fs::write(dir.join("main.js"), "console.log(1)").unwrap();
        fs::write(
            dir.join("keel.toml"),
            r#"
[build]
outDir = "dist"

[build.entries]
main = "main.js"

[server]
port = 5173

[profiles.production.build]
outDir = "publish"
"#,
        )
        .unwrap();
    }

    fn options(default_profile: &str, overrides: Overrides) -> LoadOptions<'_> {
        LoadOptions {
            default_profile,
            overrides,
            check_entries: true,
        }
    }

    #[test]
    fn default_profile_applies_only_when_declared() {
        let config = KeelConfig::default();
        assert_eq!(
            select_profile(&config, None, "development"),
            ("development".to_string(), None)
        );
        assert_eq!(
            select_profile(&config, Some("staging"), "development"),
            ("staging".to_string(), Some("staging".to_string()))
        );
    }

    #[test]
    #[serial]
    fn flags_override_profile() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path());

        let project = load_project(&project_args(dir.path()), options("production", Overrides::default())).unwrap();
        assert!(project.resolved.output().out_dir.ends_with("publish"));

        let flags = Overrides {
            build: BuildOverrides {
                out_dir: Some("out".into()),
                ..BuildOverrides::default()
            },
            ..Overrides::default()
        };
        let project = load_project(&project_args(dir.path()), options("production", flags)).unwrap();
        assert!(project.resolved.output().out_dir.ends_with("out"));
    }

    #[test]
    #[serial]
    fn env_overrides_sit_between_file_and_flags() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path());
        unsafe { std::env::set_var("KEEL_SERVER__PORT", "4000") };

        let from_env = load_project(&project_args(dir.path()), options("development", Overrides::default()));

        let flags = Overrides {
            server: ServerOverrides {
                port: Some(4100),
                ..ServerOverrides::default()
            },
            ..Overrides::default()
        };
        let from_flags = load_project(&project_args(dir.path()), options("development", flags));
        unsafe { std::env::remove_var("KEEL_SERVER__PORT") };

        assert_eq!(from_env.unwrap().resolved.port(), 4000);
        assert_eq!(from_flags.unwrap().resolved.port(), 4100);
    }

    #[test]
    #[serial]
    fn missing_config_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_project(&project_args(dir.path()), options("production", Overrides::default())).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::NotFound)));
    }

    #[test]
    #[serial]
    fn explicit_missing_config_is_file_not_found() {
        let dir = TempDir::new().unwrap();
        let mut args = project_args(dir.path());
        args.config = Some("custom/keel.toml".into());

        let err = load_project(&args, options("production", Overrides::default())).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(ref path) if path.ends_with("custom/keel.toml")));
    }

    #[test]
    #[serial]
    fn explicit_unknown_profile_fails() {
        let dir = TempDir::new().unwrap();
        write_project(dir.path());
        let mut args = project_args(dir.path());
        args.profile = Some("staging".into());

        let err = load_project(&args, options("production", Overrides::default())).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::ProfileNotFound(_))));
    }

    #[test]
    fn config_dir_of_bare_file_name_is_cwd() {
        assert_eq!(config_dir(Path::new("keel.toml")), Path::new("."));
        assert_eq!(config_dir(Path::new("/proj/keel.toml")), Path::new("/proj"));
    }
}
