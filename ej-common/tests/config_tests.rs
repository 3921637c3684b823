//! Integration tests for configuration loading and root folder resolution
//!
//! Tests that manipulate EJ_ROOT_FOLDER or EJ_CONFIG are marked with #[serial]
//! so they never race on the process environment.

use ej_common::config::{
    load_or_default, load_toml_config, resolve_root_folder, TomlConfig, CONFIG_FILE_ENV,
    ROOT_FOLDER_ENV,
};
use ej_common::{ClusterFeature, Error, Indicator, VulnerabilityTheme};
mod helpers;

use helpers::LogCapture;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::Level;

#[test]
#[serial]
fn test_cli_argument_wins_over_environment() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ej-env-root");

    let root = resolve_root_folder(Some(Path::new("/tmp/ej-cli-root")), &TomlConfig::default());
    assert_eq!(root, PathBuf::from("/tmp/ej-cli-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_environment_wins_over_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ej-env-root");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ej-toml-root")),
        ..TomlConfig::default()
    };

    let root = resolve_root_folder(None, &config);
    assert_eq!(root, PathBuf::from("/tmp/ej-env-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_root_used_without_overrides() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ej-toml-root")),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/tmp/ej-toml-root"));
    assert_eq!(resolve_root_folder(None, &TomlConfig::default()), PathBuf::from("."));
}

#[test]
fn test_load_full_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/data/nycenv"

[logging]
level = "debug"

[pipeline]
input_dir = "/data/raw"
clusters = 5
seed = 7
hazard_indicators = ["Superfund_Prox", "RMP_Prox"]
cluster_features = ["Population", "PM25", "Socioecon_Percentile"]

[pipeline.region]
counties = []
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/data/nycenv")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.pipeline.clusters, 5);
    assert_eq!(config.pipeline.seed, 7);
    assert_eq!(
        config.pipeline.hazard_indicators,
        vec![Indicator::SuperfundProx, Indicator::RmpProx]
    );
    assert_eq!(
        config.pipeline.cluster_features,
        vec![
            ClusterFeature::Population,
            ClusterFeature::Exposure(Indicator::Pm25),
            ClusterFeature::Vulnerability(VulnerabilityTheme::Socioeconomic),
        ]
    );
    assert!(config.pipeline.region.counties.is_empty());
    assert_eq!(config.pipeline.region.state_name, "NEW YORK");
    assert_eq!(
        config.pipeline.input_dir(Path::new("/ignored")),
        PathBuf::from("/data/raw")
    );
    assert_eq!(
        config.pipeline.output_dir(Path::new("/data/nycenv")),
        PathBuf::from("/data/nycenv/output_data")
    );
}

#[test]
fn test_malformed_explicit_config_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[pipeline\nclusters = ").unwrap();

    let result = load_or_default(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_missing_explicit_config_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_or_default(Some(&temp_dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_config_env_var_is_used() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("env.toml");
    std::fs::write(&path, "[pipeline]\ntop_n = 3\n").unwrap();
    env::set_var(CONFIG_FILE_ENV, &path);

    let config = load_or_default(None).unwrap();
    assert_eq!(config.pipeline.top_n, 3);

    env::remove_var(CONFIG_FILE_ENV);
}

#[test]
#[serial]
fn test_absent_default_config_warns_and_uses_defaults() {
    let empty_config_home = TempDir::new().unwrap();
    let saved_home = env::var_os("XDG_CONFIG_HOME");
    env::remove_var(CONFIG_FILE_ENV);
    env::set_var("XDG_CONFIG_HOME", empty_config_home.path());

    let logs = LogCapture::default();
    let config = logs.capture(|| load_or_default(None)).unwrap();

    match saved_home {
        Some(home) => env::set_var("XDG_CONFIG_HOME", home),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    assert_eq!(config.pipeline.clusters, 4);
    assert!(
        logs.contains(Level::WARN, "No configuration file found"),
        "captured: {:?}",
        logs.records()
    );
}

#[test]
fn test_explicit_config_load_is_logged() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[pipeline]\nclusters = 2\n").unwrap();

    let logs = LogCapture::default();
    let config = logs.capture(|| load_or_default(Some(&path))).unwrap();
    assert_eq!(config.pipeline.clusters, 2);
    assert!(logs.contains(Level::INFO, "Loading configuration from"));
}
