//! Loading pipeline configuration from disk

use mype_core::{MypePipeline, PipelineConfig};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "max_rounds = 8").unwrap();
    writeln!(file, "allow_untyped_params = false").unwrap();

    let config = PipelineConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.max_rounds, 8);
    assert!(!config.allow_untyped_params);
    assert!(config.desugar);

    let pipeline = MypePipeline::new(config.clone());
    assert_eq!(pipeline.config(), &config);
}

#[test]
fn test_missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mype.toml");
    let err = PipelineConfig::from_toml_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("mype.toml"));
}

#[test]
fn test_malformed_file_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "max_rounds = \"many\"").unwrap();

    let err = PipelineConfig::from_toml_file(file.path()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("invalid pipeline configuration"), "{message}");
}

#[test]
fn test_saved_configuration_reloads() {
    let config = PipelineConfig::default()
        .with_max_rounds(12)
        .with_trace_rules(true);
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), config.to_toml_string().unwrap()).unwrap();

    assert_eq!(PipelineConfig::from_toml_file(file.path()).unwrap(), config);
}
