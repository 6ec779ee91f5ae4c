use hwgraph_core::config::{
    Backend, DEFAULT_DATABASE, DEFAULT_GROUP_ID, DEFAULT_GROUP_NAME, DEFAULT_LOG_FILTER,
    DEFAULT_STORE_PATH,
};
use hwgraph_core::{Config, ConfigError};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.store.backend, Backend::Surreal);
    assert_eq!(config.store.path, DEFAULT_STORE_PATH);
    assert_eq!(config.store.database, DEFAULT_DATABASE);
    assert_eq!(config.inventory.default_group_id, DEFAULT_GROUP_ID);
    assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
}

#[test]
fn test_default_config_string_parses() {
    let toml_str = Config::default_config_string();
    let config: Config = toml::from_str(&toml_str).unwrap();
    assert_eq!(config.inventory.default_group_name, DEFAULT_GROUP_NAME);
}

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[store]
backend = "memory"
namespace = "lab"

[inventory]
default_group_id = "lab-default"
default_group_description = "Lab pool"

[logging]
filter = "debug"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.store.backend, Backend::Memory);
    assert_eq!(config.store.namespace, "lab");
    assert_eq!(config.store.database, DEFAULT_DATABASE);

    let settings = config.inventory.settings();
    assert_eq!(settings.default_group.id, "lab-default");
    assert_eq!(settings.default_group.name, DEFAULT_GROUP_NAME);
    assert_eq!(settings.default_group.description, "Lab pool");
    assert_eq!(settings.list_properties, vec!["links".to_string()]);
}

#[test]
fn test_from_file_rejects_bad_toml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[store\nbackend = ").unwrap();
    assert!(matches!(Config::from_file(file.path()), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_from_file_rejects_unknown_backend() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[store]\nbackend = \"cassandra\"").unwrap();
    assert!(matches!(Config::from_file(file.path()), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_from_file_rejects_empty_group_id() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[inventory]\ndefault_group_id = \"\"").unwrap();
    assert!(matches!(Config::from_file(file.path()), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        Config::from_file("/nonexistent/hwgraph.toml"),
        Err(ConfigError::ReadError(_))
    ));
}
