//! Integration tests for runtime configuration files

use factory_core::{BindingMode, ConfigError, Runtime, RuntimeConfig};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("factory.toml");
    fs::write(
        &path,
        r#"
root_namespace = "Acme.Core"
binding = "by-value"
"#,
    )
    .unwrap();

    let config = RuntimeConfig::from_file(&path).unwrap();
    assert_eq!(config.root_namespace, "Acme.Core");
    assert_eq!(config.binding, BindingMode::ByValue);
    assert!(config.register_classes);

    let runtime = Runtime::with_config(config).unwrap();
    assert_eq!(
        runtime.base_object().type_info().qualified_name(),
        "Acme.Core.BaseObject"
    );
    assert!(runtime.registry().contains("Acme.Core.BaseObject"));
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = RuntimeConfig::from_file(&temp_dir.path().join("missing.toml"));
    assert!(matches!(result, Err(ConfigError::IoError(_))));
}

#[test]
fn test_malformed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("factory.toml");
    fs::write(&path, "root_namespace = [").unwrap();

    assert!(matches!(
        RuntimeConfig::from_file(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_write_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("factory.toml");
    let config = RuntimeConfig {
        root_namespace: "Demo".to_string(),
        binding: BindingMode::ByValue,
        register_classes: false,
    };

    config.to_file(&path).unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("by-value"));
    assert_eq!(RuntimeConfig::from_file(&path).unwrap(), config);
}

#[test]
fn test_error_messages() {
    let err = RuntimeConfig::from_toml_str(r#"root_namespace = "a..b""#).unwrap_err();
    assert!(err.to_string().starts_with("Invalid configuration:"));
}
