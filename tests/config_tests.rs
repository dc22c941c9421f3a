//! Integration tests for configuration loading

use pedidos::prelude::*;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(yaml.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_full_config_from_file() {
    let file = write_config(
        r#"
identity:
  role_lookup_timeout_ms: 2500
  default_role: user
notes:
  author_label: Mostrador
reports:
  top_n: 5
  timezone: America/Caracas
catalog:
  product_search_limit: 20
server:
  bind: 0.0.0.0:8080
store:
  postgrest:
    url: https://db.example.com
    api_key: anon-key
"#,
    );

    let config = AppConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.role_lookup_timeout(), Duration::from_millis(2500));
    assert_eq!(config.identity.default_role, Role::User);
    assert_eq!(config.notes.author_label, "Mostrador");
    assert_eq!(config.reports.top_n, 5);
    assert_eq!(config.report_timezone().unwrap(), chrono_tz::America::Caracas);
    assert_eq!(config.catalog.product_search_limit, 20);
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    let postgrest = config.store.postgrest.unwrap();
    assert_eq!(postgrest.url, "https://db.example.com");
    assert_eq!(postgrest.api_key, "anon-key");
}

#[test]
fn test_empty_file_yields_defaults() {
    let file = write_config("{}\n");
    let config = AppConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.reports.top_n, 10);
    assert_eq!(config.reports.timezone, "UTC");
    assert_eq!(config.server.bind, "127.0.0.1:3000");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = AppConfig::from_yaml_file(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ConfigError::IoError { .. }));
}

#[test]
fn test_malformed_yaml_names_the_file() {
    let file = write_config("reports: [unclosed\n");
    let path = file.path().to_str().unwrap().to_string();
    let err = AppConfig::from_yaml_file(&path).unwrap_err();
    match err {
        ConfigError::ParseError { file, .. } => assert_eq!(file, Some(path)),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_invalid_values_are_rejected() {
    for yaml in [
        "reports:\n  top_n: 0\n",
        "catalog:\n  product_search_limit: 0\n",
        "reports:\n  timezone: Nowhere/Special\n",
    ] {
        let err = AppConfig::from_yaml_str(yaml).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { .. }),
            "{} should be rejected",
            yaml.trim()
        );
    }
}

#[test]
fn test_admin_default_role_is_accepted() {
    let config = AppConfig::from_yaml_str("identity:\n  default_role: admin\n").unwrap();
    assert_eq!(config.identity.default_role, Role::Admin);
}
