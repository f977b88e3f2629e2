#![cfg(test)]

use std::path::Path;
use std::time::Duration;

use tempfile::tempdir;

use crate::harness::runner::TestMode;
use crate::plugin_system::models::DocType;
use crate::storage::config::{ConfigFormat, HostSettings};
use crate::storage::error::StorageSystemError;

#[test]
fn test_defaults() {
    let settings = HostSettings::default();
    assert_eq!(settings.call_timeout(), Duration::from_secs(5));
    assert_eq!(settings.run_timeout(), None);
    assert_eq!(settings.mode, TestMode::Smoke);
    assert!(settings.credentials.is_empty());
}

#[test]
fn test_json_settings_with_partial_fields() {
    let data = r#"{
        "call_timeout_secs": 2,
        "mode": "ALL",
        "credentials": {"api_key": "abc"},
        "ledger_params": {"customer_id": "C-9", "limit": 50, "doc_types": ["invoice", "credit_note"]}
    }"#;

    let settings = HostSettings::deserialize(data, ConfigFormat::Json).unwrap();

    assert_eq!(settings.call_timeout(), Duration::from_secs(2));
    assert_eq!(settings.source_test_timeout_secs, 120);
    assert_eq!(settings.mode, TestMode::All);
    assert_eq!(settings.credentials["api_key"], "abc");
    assert_eq!(settings.ledger_params.customer_id, "C-9");
    assert_eq!(settings.ledger_params.common.limit, 50);
    assert_eq!(settings.ledger_params.doc_types, [DocType::Invoice, DocType::CreditNote]);
}

#[cfg(feature = "toml-config")]
#[test]
fn test_toml_settings() {
    let data = r#"
call_timeout_secs = 3
run_timeout_secs = 90
mode = "source"

[credentials]
token = "t"
"#;
    let settings = HostSettings::deserialize(data, ConfigFormat::Toml).unwrap();
    assert_eq!(settings.run_timeout(), Some(Duration::from_secs(90)));
    assert_eq!(settings.mode, TestMode::Source);
    assert_eq!(settings.credentials["token"], "t");
}

#[cfg(feature = "yaml-config")]
#[test]
fn test_yaml_settings() {
    let data = "mode: smoke\ncontact_params:\n  search: acme\n  limit: 10\n";
    let settings = HostSettings::deserialize(data, ConfigFormat::Yaml).unwrap();
    assert_eq!(settings.contact_params.search, "acme");
    assert_eq!(settings.contact_params.common.limit, 10);
}

#[test]
fn test_invalid_data_is_a_deserialization_error() {
    let err = HostSettings::deserialize("{ not json", ConfigFormat::Json).unwrap_err();
    assert!(matches!(err, StorageSystemError::DeserializationError { ref format, .. } if format == "json"));
}

#[test]
fn test_json_serialization_reads_back() {
    let mut settings = HostSettings::default();
    settings.mode = TestMode::Source;
    settings.run_timeout_secs = Some(30);
    let text = settings.serialize(ConfigFormat::Json).unwrap();
    assert_eq!(HostSettings::deserialize(&text, ConfigFormat::Json).unwrap(), settings);
}

#[test]
fn test_format_from_path() {
    assert_eq!(ConfigFormat::from_path(Path::new("config.JSON")), Some(ConfigFormat::Json));
    assert_eq!(ConfigFormat::from_path(Path::new("config.ini")), None);
    assert_eq!(ConfigFormat::from_path(Path::new("config")), None);
    #[cfg(feature = "yaml-config")]
    assert_eq!(ConfigFormat::from_path(Path::new("config.yml")), Some(ConfigFormat::Yaml));
}

#[test]
fn test_load_errors() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("config.json");
    assert!(matches!(HostSettings::load(&missing), Err(StorageSystemError::FileNotFound(p)) if p == missing));

    let ini = dir.path().join("config.ini");
    std::fs::write(&ini, "x=1").unwrap();
    assert!(matches!(HostSettings::load(&ini), Err(StorageSystemError::UnsupportedConfigFormat(_))));
}

#[test]
fn test_resolve_prefers_explicit_then_base_dir_then_defaults() {
    let base = tempdir().unwrap();
    assert_eq!(HostSettings::resolve(None, base.path()).unwrap(), HostSettings::default());

    std::fs::write(base.path().join("config.json"), r#"{"call_timeout_secs": 7}"#).unwrap();
    assert_eq!(HostSettings::find_in(base.path()), Some(base.path().join("config.json")));
    assert_eq!(HostSettings::resolve(None, base.path()).unwrap().call_timeout_secs, 7);

    let other = tempdir().unwrap();
    let explicit = other.path().join("custom.json");
    std::fs::write(&explicit, r#"{"call_timeout_secs": 11}"#).unwrap();
    assert_eq!(HostSettings::resolve(Some(&explicit), base.path()).unwrap().call_timeout_secs, 11);
}
