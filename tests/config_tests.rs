use auditdesk::config::{
    load_config, save_config, AuditConfig, ConfigValidator, Dtype, RulePatch, SchemaFieldPatch,
    Severity, DEFAULT_RULE_EXPRESSION,
};
use auditdesk::error::AuditDeskError;
use std::path::Path;
use tempfile::TempDir;

fn fixtures_path() -> &'static Path {
    Path::new("tests/fixtures")
}

#[test]
fn test_load_fixture_config() {
    let config = load_config(fixtures_path().join("orders_config.yaml")).unwrap();
    assert_eq!(config.dataset_name, "orders");
    assert_eq!(config.primary_key_columns(), ["id".to_string()]);
    assert_eq!(config.schema.len(), 3);
    assert_eq!(config.schema[2].dtype, Dtype::Category);
    assert_eq!(
        config.schema[2].allowed_values.as_deref(),
        Some(&["open".to_string(), "shipped".to_string(), "cancelled".to_string()][..])
    );
    assert_eq!(config.rules[0].severity, Severity::Error);

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(!result.has_warnings());
}

#[test]
fn test_yaml_json_save_load() {
    let tmp = TempDir::new().unwrap();
    let config = load_config(fixtures_path().join("orders_config.yaml")).unwrap();

    let json_path = tmp.path().join("orders.json");
    save_config(&config, &json_path).unwrap();
    let reloaded = load_config(&json_path).unwrap();
    assert_eq!(reloaded, config);

    let yaml_path = tmp.path().join("orders.yml");
    save_config(&reloaded, &yaml_path).unwrap();
    assert_eq!(load_config(&yaml_path).unwrap(), config);
}

#[test]
fn test_load_missing_file() {
    let err = load_config("tests/fixtures/does_not_exist.yaml").unwrap_err();
    assert!(matches!(err, AuditDeskError::Config(_)));
}

#[test]
fn test_edit_session_preserves_order() {
    let mut config = AuditConfig::new("customers");

    for _ in 0..3 {
        config.add_schema_field();
    }
    config
        .update_schema_field(1, SchemaFieldPatch::new().with_name("email").with_dtype(Dtype::String))
        .unwrap();
    let names: Vec<_> = config.schema.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["field_1", "email", "field_3"]);

    config.remove_schema_field(0).unwrap();
    let names: Vec<_> = config.schema.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["email", "field_3"]);

    let idx = config.add_rule();
    assert_eq!(config.rules[idx].expression, DEFAULT_RULE_EXPRESSION);
    config
        .update_rule(idx, RulePatch::new().with_expression("age >= 0").with_severity(Severity::Error))
        .unwrap();
    assert_eq!(config.rules[idx].name, "rule_1");
    assert_eq!(config.rules[idx].severity, Severity::Error);
}

#[test]
fn test_out_of_range_edits_leave_config_intact() {
    let mut config = AuditConfig::new("customers");
    config.add_schema_field();
    let before = config.clone();

    assert!(matches!(
        config.update_schema_field(5, SchemaFieldPatch::new().with_name("x")),
        Err(AuditDeskError::IndexOutOfRange { .. })
    ));
    assert!(config.remove_rule(0).is_err());
    assert!(config.move_schema_field(0, 3).is_err());
    assert_eq!(config, before);
}

#[test]
fn test_validator_blocks_bad_primary_key() {
    let mut config = load_config(fixtures_path().join("orders_config.yaml")).unwrap();
    config.set_primary_key_raw("id, order_ref");

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert_eq!(result.errors[0].code, "E006");
    assert!(result.summary().contains("order_ref"));
}

#[test]
fn test_seed_schema_skips_existing() {
    let mut config = load_config(fixtures_path().join("orders_config.yaml")).unwrap();
    let added = config.seed_schema_from_columns(&[
        "id".to_string(),
        "customer".to_string(),
        "created_at".to_string(),
    ]);
    assert_eq!(added, 2);
    assert_eq!(config.schema.len(), 5);
    assert_eq!(config.schema[3].name, "customer");
}
