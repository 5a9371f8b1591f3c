//! Configuration File Integration Tests

use target_templating::{EngineConfig, Error, Language, Syntax, TargetNormalizationPipeline, TemplateVariable};
use tempfile::TempDir;

#[test]
fn test_save_and_load_roundtrip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("engine.toml");
    let path = path.to_str().unwrap();

    let mut config = EngineConfig {
        language: Language::En,
        default_syntax: Syntax::Csv,
        ..Default::default()
    };
    config.links.base_url = "https://monitor.example.com".to_string();
    config.links.biz_id = "7".to_string();
    config.save_to_file(path).unwrap();

    let loaded = EngineConfig::from_file(path).unwrap();
    assert_eq!(loaded.language, Language::En);
    assert_eq!(loaded.default_syntax, Syntax::Csv);
    assert_eq!(loaded.links.base_url, "https://monitor.example.com");
    assert_eq!(loaded.links.biz_id, "7");
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "metric_id_label = \"Metric\"\n").unwrap();

    let config = EngineConfig::from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.language, Language::Zh);
    assert_eq!(config.default_syntax, Syntax::Glob);
    assert_eq!(config.logging.log_level, "info");
    assert_eq!(config.metric_id_label(), "Metric");
}

#[test]
fn test_invalid_file_is_configuration_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "language = \"fr\"\n").unwrap();

    let err = EngineConfig::from_file(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("absent.toml");
    let err = EngineConfig::from_file(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_configured_label_reaches_pipeline() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "language = \"en\"\n").unwrap();
    let config = EngineConfig::from_file(path.to_str().unwrap()).unwrap();

    let vars: Vec<TemplateVariable> = Vec::new();
    let pipeline = TargetNormalizationPipeline::new(&config, &vars);
    let raw = serde_json::json!({
        "refId": "A",
        "query_configs": [{
            "data_source_label": "custom",
            "data_type_label": "event",
            "result_table_id": "2_event"
        }]
    });
    let out = pipeline.normalize(&[raw], true);
    assert_eq!(out.metric_id_query, "Metric ID : custom.event.2_event.*");
}
