//! Integration tests for configuration loading and validation

use entgraph::config::Config;
use entgraph::entities::{EntityStore, DEFAULT_MAX_DEPTH};
use entgraph::EntityError;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.extraction.max_depth = 4;
    config.output.pretty = false;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.meta.schema_version, "1.0.0");
    assert_eq!(loaded.extraction.max_depth, 4);
    assert!(!loaded.output.pretty);
    assert!(loaded.graph.include_descriptions);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        Config::load(&path),
        Err(EntityError::ConfigNotFound { .. })
    ));
    let config = Config::load_or_default(&path).unwrap();
    assert_eq!(config.extraction.max_depth, DEFAULT_MAX_DEPTH);
}

#[test]
fn test_invalid_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[_meta\nschema_version = ").unwrap();

    assert!(matches!(Config::load(&path), Err(EntityError::Toml(_))));
}

#[test]
fn test_validation_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[_meta]\nschema_version = \"1.0.0\"\n\n[extraction]\nmax_depth = 0\n",
    )
    .unwrap();

    match Config::load(&path) {
        Err(EntityError::ConfigValidation { errors }) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].path, "extraction.max_depth");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_depth_bound_from_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[_meta]\nschema_version = \"1.0.0\"\n\n[extraction]\nmax_depth = 1\n",
    )
    .unwrap();
    let config = Config::load(&path).unwrap();

    let mut store = EntityStore::from_config(&config.extraction);
    let raw = serde_json::json!({
        "Type": "process",
        "ParentProcess": {"ProcessId": "2", "ParentProcess": {"ProcessId": "3"}}
    });
    store.instantiate(&raw, None).unwrap();
    assert_eq!(store.len(), 2);
}
