use portal_optimistic::{CoordinatorConfig, MIN_TEMP_ID_LEN, OptimisticError};
use pretty_assertions::assert_eq;
use std::io::Write;

#[test]
fn defaults() {
    let config = CoordinatorConfig::default();
    assert_eq!(config.key_field, "id");
    assert!(config.revert_on_error);
    assert_eq!(config.temp_id_len, 9);
    assert_eq!(config.event_capacity, 64);
    assert_eq!(config.error_title, "Error");
    assert!(config.validate().is_ok());
}

#[test]
fn empty_toml_is_default() {
    let config = CoordinatorConfig::from_toml_str("").unwrap();
    assert_eq!(config, CoordinatorConfig::default());
}

#[test]
fn partial_toml_overrides_only_given_fields() {
    let config = CoordinatorConfig::from_toml_str(
        r#"
        key_field = "mrn"
        revert_on_error = false
        "#,
    )
    .unwrap();

    assert_eq!(config.key_field, "mrn");
    assert!(!config.revert_on_error);
    assert_eq!(config.temp_id_len, 9);
}

#[test]
fn malformed_toml_is_config_error() {
    let err = CoordinatorConfig::from_toml_str("revert_on_error = \"sometimes\"").unwrap_err();
    assert!(matches!(err, OptimisticError::Config(_)));
}

#[test]
fn empty_key_field_is_rejected() {
    let err = CoordinatorConfig::from_toml_str("key_field = \"  \"").unwrap_err();
    assert!(err.to_string().contains("key_field"));
}

#[test]
fn short_temp_ids_are_rejected() {
    let config = CoordinatorConfig {
        temp_id_len: MIN_TEMP_ID_LEN - 1,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(OptimisticError::Config(_))));
}

#[test]
fn zero_event_capacity_is_rejected() {
    let config = CoordinatorConfig {
        event_capacity: 0,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "temp_id_len = 12").unwrap();
    writeln!(file, "delete_success_title = \"Removed\"").unwrap();

    let config = CoordinatorConfig::load(file.path()).unwrap();
    assert_eq!(config.temp_id_len, 12);
    assert_eq!(config.delete_success_title, "Removed");
}

#[test]
fn load_missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = CoordinatorConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn builder_helpers() {
    let config = CoordinatorConfig::default()
        .with_key_field("mrn")
        .with_revert_on_error(false);
    assert_eq!(config.key_field, "mrn");
    assert!(!config.revert_on_error);
}
