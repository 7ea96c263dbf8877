//! Integration tests for the build command.
//!
//! These drive `commands::build::execute` against real project directories.
//! They read the process environment, so they run serially.

use keel_cli::cli::{BuildArgs, ProjectArgs};
use keel_cli::commands::build;
use keel_cli::{BuildError, CliError};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn args(dir: &Path) -> BuildArgs {
    BuildArgs {
        project: ProjectArgs {
            dir: dir.to_path_buf(),
            config: None,
            profile: None,
        },
        out_dir: None,
        sourcemap: false,
        hash: false,
        no_empty_out_dir: false,
    }
}

fn write_project(dir: &Path, config: &str) {
    fs::create_dir_all(dir.join("src/ShiningSword/sandbox")).unwrap();
    fs::write(
        dir.join("src/ShiningSword/main.js"),
        "fetch(import.meta.env.BASE_URL + 'api')",
    )
    .unwrap();
    fs::write(
        dir.join("src/ShiningSword/sandbox/main.js"),
        "console.log(__APP_VERSION__)",
    )
    .unwrap();
    fs::write(dir.join("keel.toml"), config).unwrap();
}

const CONFIG: &str = r#"
root = "src/ShiningSword"
base = "/ShiningSword/"

[build]
outDir = "publish"

[build.entries]
main = "main.js"
sandbox = "sandbox/main.js"

[define]
__APP_VERSION__ = "\"1.0.0\""

[env]
dotenv = false
"#;

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn out_dir(project: &Path) -> PathBuf {
    project.join("src/ShiningSword/publish")
}

#[tokio::test]
#[serial]
async fn purge_then_write_exactly_declared_artifacts() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), CONFIG);
    let out = out_dir(temp.path());
    fs::create_dir_all(out.join("assets")).unwrap();
    fs::write(out.join("stale.js"), "old").unwrap();

    build::execute(args(temp.path())).await.unwrap();

    assert_eq!(listing(&out), vec!["main.js", "manifest.json", "sandbox.js"]);
    assert_eq!(
        fs::read_to_string(out.join("main.js")).unwrap(),
        r#"fetch("/ShiningSword/" + 'api')"#
    );
    assert_eq!(
        fs::read_to_string(out.join("sandbox.js")).unwrap(),
        r#"console.log("1.0.0")"#
    );

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["main"], "main.js");
    assert_eq!(manifest["sandbox"], "sandbox.js");
}

#[tokio::test]
#[serial]
async fn keeps_prior_files_when_purge_disabled() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), CONFIG);
    let out = out_dir(temp.path());
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("keep.txt"), "keep").unwrap();

    let mut args = args(temp.path());
    args.no_empty_out_dir = true;
    build::execute(args).await.unwrap();

    assert!(out.join("keep.txt").exists());
    assert!(out.join("main.js").exists());
}

#[tokio::test]
#[serial]
async fn hashed_names_and_source_maps_from_flags() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), CONFIG);

    let mut args = args(temp.path());
    args.hash = true;
    args.sourcemap = true;
    args.out_dir = Some("dist".into());
    build::execute(args).await.unwrap();

    let out = temp.path().join("src/ShiningSword/dist");
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("manifest.json")).unwrap()).unwrap();
    let main = manifest["main"].as_str().unwrap();
    assert!(main.starts_with("main-") && main.ends_with(".js"));
    assert!(out.join(main).exists());
    assert!(out.join(format!("{main}.map")).exists());
}

#[tokio::test]
#[serial]
async fn production_profile_is_applied_by_default() {
    let temp = TempDir::new().unwrap();
    let config = format!("{CONFIG}\n[profiles.production.build]\noutDir = \"release\"\n");
    write_project(temp.path(), &config);

    build::execute(args(temp.path())).await.unwrap();

    assert!(temp.path().join("src/ShiningSword/release/main.js").exists());
}

#[tokio::test]
#[serial]
async fn unresolved_variable_leaves_previous_output() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), CONFIG);
    fs::write(
        temp.path().join("src/ShiningSword/main.js"),
        "x(import.meta.env.SECRET_TOKEN)",
    )
    .unwrap();
    let out = out_dir(temp.path());
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("main.js"), "previous").unwrap();

    let err = build::execute(args(temp.path())).await.unwrap_err();

    assert!(matches!(err, CliError::Build(BuildError::Substitution { .. })));
    assert_eq!(fs::read_to_string(out.join("main.js")).unwrap(), "previous");
}

#[tokio::test]
#[serial]
async fn out_dir_outside_root_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), CONFIG);

    let mut args = args(temp.path());
    args.out_dir = Some("../../elsewhere".into());
    let err = build::execute(args).await.unwrap_err();

    assert!(matches!(
        err,
        CliError::Config(keel_config::ConfigError::InvalidOutputDirectory { .. })
    ));
    assert!(!temp.path().join("elsewhere").exists());
}
