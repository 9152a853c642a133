//! Configuration Tests
//!
//! A `quarry.toml` on disk driving connection and command defaults.

use std::fs;

use tempfile::TempDir;

use crate::common::*;
use quarry::{Connection, ErrorKind, QuarryConfig, CONFIG_FILE_NAME};

#[test]
fn file_config_drives_command_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        "[plan_cache]\ncapacity = 2\n\n[command]\nenable_plan_caching = false\ndefault_timeout_secs = 9\n",
    )
    .unwrap();

    let config = QuarryConfig::from_file(&path).unwrap();
    let env = TestEnv::builder().config(config).open();
    assert_eq!(env.connection.plan_cache().capacity(), 2);

    let cmd = env.command("SELECT 1");
    assert!(!cmd.enable_plan_caching());
    assert_eq!(cmd.command_timeout(), 9);

    cmd.execute_non_query().unwrap();
    assert_eq!(env.provider.log().last().unwrap().timeout, 9);
    assert!(env.connection.plan_cache().is_empty());
}

#[test]
fn default_file_written_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    QuarryConfig::write_default_if_missing(&path).unwrap();
    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written, QuarryConfig::default_toml());

    fs::write(&path, "[plan_cache]\ncapacity = 5\n").unwrap();
    QuarryConfig::write_default_if_missing(&path).unwrap();
    assert_eq!(QuarryConfig::from_file(&path).unwrap().plan_cache.capacity, 5);
}

#[test]
fn invalid_config_rejected_by_builder() {
    let mut config = QuarryConfig::default();
    config.plan_cache.capacity = 0;

    let err = Connection::builder()
        .workspace(northwind())
        .config(config)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn written_config_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    let mut config = QuarryConfig::default();
    config.command.default_timeout_secs = Some(120);

    config.write_to_file(&path).unwrap();
    assert_eq!(QuarryConfig::from_file(&path).unwrap(), config);
}
