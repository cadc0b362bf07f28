use tracing::debug;
use crate::error::{AuditDeskError, Result};
use super::types::{AuditConfig, Dtype, RuleDefinition, SchemaField, Severity};

/// Expression seeded into fresh rules: valid for the engine, matches every row.
pub const DEFAULT_RULE_EXPRESSION: &str = "1 = 1";

pub fn parse_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Partial update for a [`SchemaField`]. Unset attributes are left untouched;
/// the doubly-optional attributes distinguish "leave" from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaFieldPatch {
    pub name: Option<String>,
    pub dtype: Option<Dtype>,
    pub nullable: Option<bool>,
    pub min: Option<Option<f64>>,
    pub max: Option<Option<f64>>,
    pub allowed_values: Option<Option<Vec<String>>>,
    pub regex: Option<Option<String>>,
}

impl SchemaFieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_dtype(mut self, dtype: Dtype) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn with_min(mut self, min: Option<f64>) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: Option<f64>) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_allowed_values(mut self, values: Option<Vec<String>>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    /// Allowed values from a raw comma-separated string. Input with no
    /// non-empty tokens clears the constraint.
    pub fn with_allowed_values_raw(self, raw: &str) -> Self {
        let values = parse_comma_list(raw);
        if values.is_empty() {
            self.with_allowed_values(None)
        } else {
            self.with_allowed_values(Some(values))
        }
    }

    pub fn with_regex(mut self, regex: Option<String>) -> Self {
        self.regex = Some(regex);
        self
    }

    fn apply(self, field: &mut SchemaField) {
        if let Some(name) = self.name {
            field.name = name;
        }
        if let Some(dtype) = self.dtype {
            field.dtype = dtype;
        }
        if let Some(nullable) = self.nullable {
            field.nullable = nullable;
        }
        if let Some(min) = self.min {
            field.min = min;
        }
        if let Some(max) = self.max {
            field.max = max;
        }
        if let Some(values) = self.allowed_values {
            field.allowed_values = values;
        }
        if let Some(regex) = self.regex {
            field.regex = regex.filter(|r| !r.is_empty());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulePatch {
    pub name: Option<String>,
    pub expression: Option<String>,
    pub severity: Option<Severity>,
    pub description: Option<Option<String>>,
}

impl RulePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    fn apply(self, rule: &mut RuleDefinition) {
        if let Some(name) = self.name {
            rule.name = name;
        }
        if let Some(expression) = self.expression {
            rule.expression = expression;
        }
        if let Some(severity) = self.severity {
            rule.severity = severity;
        }
        if let Some(description) = self.description {
            rule.description = description.filter(|d| !d.is_empty());
        }
    }
}

fn check_index(kind: &'static str, index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(AuditDeskError::index_out_of_range(kind, index, len));
    }
    Ok(())
}

fn move_item<T>(items: &mut Vec<T>, kind: &'static str, from: usize, to: usize) -> Result<()> {
    check_index(kind, from, items.len())?;
    check_index(kind, to, items.len())?;
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

impl AuditConfig {
    pub fn add_schema_field(&mut self) -> usize {
        let index = self.schema.len();
        self.schema.push(SchemaField::new(format!("field_{}", index + 1), Dtype::String));
        debug!("Added schema field at index {}", index);
        index
    }

    pub fn update_schema_field(&mut self, index: usize, patch: SchemaFieldPatch) -> Result<()> {
        check_index("schema field", index, self.schema.len())?;
        patch.apply(&mut self.schema[index]);
        Ok(())
    }

    pub fn remove_schema_field(&mut self, index: usize) -> Result<SchemaField> {
        check_index("schema field", index, self.schema.len())?;
        Ok(self.schema.remove(index))
    }

    pub fn move_schema_field(&mut self, from: usize, to: usize) -> Result<()> {
        move_item(&mut self.schema, "schema field", from, to)
    }

    pub fn add_rule(&mut self) -> usize {
        let index = self.rules.len();
        self.rules.push(RuleDefinition::new(
            format!("rule_{}", index + 1),
            DEFAULT_RULE_EXPRESSION,
            Severity::default(),
        ));
        debug!("Added rule at index {}", index);
        index
    }

    pub fn update_rule(&mut self, index: usize, patch: RulePatch) -> Result<()> {
        check_index("rule", index, self.rules.len())?;
        patch.apply(&mut self.rules[index]);
        Ok(())
    }

    pub fn remove_rule(&mut self, index: usize) -> Result<RuleDefinition> {
        check_index("rule", index, self.rules.len())?;
        Ok(self.rules.remove(index))
    }

    pub fn move_rule(&mut self, from: usize, to: usize) -> Result<()> {
        move_item(&mut self.rules, "rule", from, to)
    }

    pub fn set_dataset_name(&mut self, name: impl Into<String>) {
        self.dataset_name = name.into();
    }

    pub fn set_primary_key_raw(&mut self, raw: &str) {
        let columns = parse_comma_list(raw);
        self.primary_key = if columns.is_empty() { None } else { Some(columns) };
    }

    pub fn clear_primary_key(&mut self) {
        self.primary_key = None;
    }

    pub fn seed_schema_from_columns(&mut self, columns: &[String]) -> usize {
        let mut added = 0;
        for column in columns {
            if column.is_empty() || self.has_field(column) {
                continue;
            }
            self.schema.push(SchemaField::new(column.clone(), Dtype::String));
            added += 1;
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma_list() {
        assert_eq!(parse_comma_list("a, ,b"), vec!["a", "b"]);
        assert_eq!(parse_comma_list("a, b ,, c"), vec!["a", "b", "c"]);
        assert!(parse_comma_list(" , ,").is_empty());
        assert!(parse_comma_list("").is_empty());
    }

    #[test]
    fn test_add_schema_field_names() {
        let mut config = AuditConfig::default();
        assert_eq!(config.add_schema_field(), 0);
        assert_eq!(config.add_schema_field(), 1);
        assert_eq!(config.schema[0].name, "field_1");
        assert_eq!(config.schema[1].name, "field_2");
        assert_eq!(config.schema[0].dtype, Dtype::String);
        assert!(config.schema[0].nullable);
    }

    #[test]
    fn test_add_schema_field_no_collision_check() {
        let mut config = AuditConfig::default();
        config.add_schema_field();
        config.add_schema_field();
        config.remove_schema_field(0).unwrap();
        config.add_schema_field();
        let names: Vec<_> = config.schema.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["field_2", "field_2"]);
    }

    #[test]
    fn test_remove_shifts_down() {
        let mut config = AuditConfig::default();
        config.add_schema_field();
        config.add_schema_field();
        let removed = config.remove_schema_field(0).unwrap();
        assert_eq!(removed.name, "field_1");
        assert_eq!(config.schema.len(), 1);
        assert_eq!(config.schema[0].name, "field_2");
    }

    #[test]
    fn test_update_allowed_values_raw() {
        let mut config = AuditConfig::default();
        config.add_schema_field();
        config
            .update_schema_field(0, SchemaFieldPatch::new().with_allowed_values_raw("a, b ,, c"))
            .unwrap();
        assert_eq!(
            config.schema[0].allowed_values,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_update_merges_partial() {
        let mut config = AuditConfig::default();
        config.add_schema_field();
        config
            .update_schema_field(0, SchemaFieldPatch::new().with_name("age").with_min(Some(0.0)))
            .unwrap();
        config
            .update_schema_field(0, SchemaFieldPatch::new().with_dtype(Dtype::Integer).with_nullable(false))
            .unwrap();

        let field = &config.schema[0];
        assert_eq!(field.name, "age");
        assert_eq!(field.dtype, Dtype::Integer);
        assert!(!field.nullable);
        assert_eq!(field.min, Some(0.0));
        assert_eq!(field.max, None);
    }

    #[test]
    fn test_update_out_of_range() {
        let mut config = AuditConfig::default();
        let err = config.update_schema_field(0, SchemaFieldPatch::new()).unwrap_err();
        assert!(matches!(err, AuditDeskError::IndexOutOfRange { index: 0, len: 0, .. }));
        assert!(config.remove_schema_field(3).is_err());
        assert!(config.update_rule(0, RulePatch::new()).is_err());
        assert!(config.remove_rule(0).is_err());
    }

    #[test]
    fn test_add_rule_seeds_inert_expression() {
        let mut config = AuditConfig::default();
        config.add_rule();
        assert_eq!(config.rules[0].name, "rule_1");
        assert_eq!(config.rules[0].expression, "1 = 1");
        assert_eq!(config.rules[0].severity, Severity::Warning);
    }

    #[test]
    fn test_update_and_remove_rule() {
        let mut config = AuditConfig::default();
        config.add_rule();
        config.add_rule();
        config
            .update_rule(
                1,
                RulePatch::new()
                    .with_name("qty_positive")
                    .with_expression("qty > 0")
                    .with_severity(Severity::Error),
            )
            .unwrap();
        config.remove_rule(0).unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].name, "qty_positive");
        assert_eq!(config.rules[0].severity, Severity::Error);
    }

    #[test]
    fn test_move_schema_field() {
        let mut config = AuditConfig::default();
        for _ in 0..3 {
            config.add_schema_field();
        }
        config.move_schema_field(2, 0).unwrap();
        let names: Vec<_> = config.schema.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["field_3", "field_1", "field_2"]);
        assert!(config.move_schema_field(0, 3).is_err());
    }

    #[test]
    fn test_set_primary_key_raw() {
        let mut config = AuditConfig::default();
        config.set_primary_key_raw("order_id, line");
        assert_eq!(config.primary_key_columns(), &["order_id".to_string(), "line".to_string()]);
        config.set_primary_key_raw(" , ");
        assert!(config.primary_key.is_none());
    }

    #[test]
    fn test_seed_schema_from_columns() {
        let mut config = AuditConfig::default();
        config.schema.push(SchemaField::new("id", Dtype::Integer));
        let added = config.seed_schema_from_columns(&["id".to_string(), "name".to_string(), "email".to_string()]);
        assert_eq!(added, 2);
        assert_eq!(config.schema[0].dtype, Dtype::Integer);
        assert_eq!(config.schema[2].name, "email");
    }
}
