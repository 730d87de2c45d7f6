//! Integration tests for Settings layered loading.
//!
//! Note: These tests run without a global config (temp directories only),
//! so they test local config merging with compiled defaults.

use std::fs;

use tempfile::TempDir;

use sponsor_tree::application::ApplicationError;
use sponsor_tree::config::{local_config_path, Settings};
use sponsor_tree::domain::Topology;

#[test]
fn given_no_local_config_when_load_then_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.topology, Topology::Unbounded);
    assert_eq!(settings.commission.exponent, 0.5);
    assert_eq!(settings.commission.default_percentages, vec![0.10, 0.05]);
    assert!(settings.data_file.ends_with("members.tsv"));
}

#[test]
fn given_local_config_when_load_then_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let local = r#"
topology = "binary"

[commission]
exponent = 1.0
default_percentages = [0.2, 0.1, 0.05]
"#;
    fs::write(local_config_path(dir.path()), local).unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.topology, Topology::Binary);
    assert_eq!(settings.commission.exponent, 1.0);
    assert_eq!(
        settings.commission.default_percentages,
        vec![0.2, 0.1, 0.05]
    );
}

#[test]
fn given_relative_data_file_in_local_config_when_load_then_resolved_against_project_dir() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "data_file = \"data/members.tsv\"\n",
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.data_file, dir.path().join("data/members.tsv"));
}

#[test]
fn given_partial_commission_table_when_load_then_other_keys_kept() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "[commission]\nexponent = 0.0\n",
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.commission.exponent, 0.0);
    assert_eq!(settings.commission.default_percentages, vec![0.10, 0.05]);
}

#[test]
fn given_invalid_toml_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "topology = [unclosed\n").unwrap();

    let err = Settings::load(Some(dir.path())).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
    assert!(err.to_string().contains(".sponsor-tree.toml"));
}

#[test]
fn given_unknown_topology_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "topology = \"ternary\"\n").unwrap();

    let err = Settings::load(Some(dir.path())).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_template_when_written_as_local_config_then_loads_to_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), Settings::template()).unwrap();

    let settings = Settings::load(Some(dir.path())).expect("template loads");

    assert_eq!(settings.topology, Topology::Unbounded);
    assert_eq!(settings.commission.exponent, 0.5);
}
