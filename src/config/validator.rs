use std::collections::HashSet;
use regex::Regex;
use super::types::{AuditConfig, Dtype};

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub dataset_name: String,
    pub errors: Vec<ValidationFinding>,
    pub warnings: Vec<ValidationFinding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFinding {
    pub code: &'static str,
    pub message: String,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("[{}] {}", e.code, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Pre-submission checks. The engine owns real validation; these catch
/// mistakes that would otherwise cost a round trip.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AuditConfig) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        Self::check_dataset_name(config, &mut errors);
        Self::check_duplicate_fields(config, &mut errors);
        Self::check_regex_patterns(config, &mut errors);
        Self::check_ranges(config, &mut errors);
        Self::check_rule_expressions(config, &mut errors);
        Self::check_primary_key_columns(config, &mut errors);
        Self::check_duplicate_rules(config, &mut warnings);
        Self::check_range_dtype(config, &mut warnings);
        Self::check_allowed_values_dtype(config, &mut warnings);
        Self::check_empty_schema(config, &mut warnings);

        ValidationResult {
            dataset_name: config.dataset_name.clone(),
            errors,
            warnings,
        }
    }

    fn check_dataset_name(config: &AuditConfig, errors: &mut Vec<ValidationFinding>) {
        if config.dataset_name.trim().is_empty() {
            errors.push(ValidationFinding {
                code: "E001",
                message: "dataset_name must not be empty".to_string(),
            });
        }
    }

    fn check_duplicate_fields(config: &AuditConfig, errors: &mut Vec<ValidationFinding>) {
        let mut seen = HashSet::new();
        for field in &config.schema {
            if !seen.insert(field.name.as_str()) {
                errors.push(ValidationFinding {
                    code: "E002",
                    message: format!("duplicate schema field name: '{}'", field.name),
                });
            }
        }
    }

    fn check_regex_patterns(config: &AuditConfig, errors: &mut Vec<ValidationFinding>) {
        for field in &config.schema {
            if let Some(pattern) = &field.regex {
                if let Err(e) = Regex::new(pattern) {
                    errors.push(ValidationFinding {
                        code: "E003",
                        message: format!("field '{}': invalid regex: {}", field.name, e),
                    });
                }
            }
        }
    }

    fn check_ranges(config: &AuditConfig, errors: &mut Vec<ValidationFinding>) {
        for field in &config.schema {
            if let (Some(min), Some(max)) = (field.min, field.max) {
                if min > max {
                    errors.push(ValidationFinding {
                        code: "E004",
                        message: format!("field '{}': min {} is greater than max {}", field.name, min, max),
                    });
                }
            }
        }
    }

    fn check_rule_expressions(config: &AuditConfig, errors: &mut Vec<ValidationFinding>) {
        for rule in &config.rules {
            if rule.expression.trim().is_empty() {
                errors.push(ValidationFinding {
                    code: "E005",
                    message: format!("rule '{}' has an empty expression", rule.name),
                });
            }
        }
    }

    fn check_primary_key_columns(config: &AuditConfig, errors: &mut Vec<ValidationFinding>) {
        if config.schema.is_empty() {
            return;
        }
        for column in config.primary_key_columns() {
            if !config.has_field(column) {
                errors.push(ValidationFinding {
                    code: "E006",
                    message: format!("primary key column '{}' not found in schema", column),
                });
            }
        }
    }

    fn check_duplicate_rules(config: &AuditConfig, warnings: &mut Vec<ValidationFinding>) {
        let mut seen = HashSet::new();
        for rule in &config.rules {
            if !seen.insert(rule.name.as_str()) {
                warnings.push(ValidationFinding {
                    code: "W001",
                    message: format!("duplicate rule name: '{}'", rule.name),
                });
            }
        }
    }

    fn check_range_dtype(config: &AuditConfig, warnings: &mut Vec<ValidationFinding>) {
        for field in &config.schema {
            if (field.min.is_some() || field.max.is_some()) && !field.dtype.is_numeric() {
                warnings.push(ValidationFinding {
                    code: "W002",
                    message: format!("field '{}': min/max ignored for dtype {}", field.name, field.dtype),
                });
            }
        }
    }

    fn check_allowed_values_dtype(config: &AuditConfig, warnings: &mut Vec<ValidationFinding>) {
        for field in &config.schema {
            let has_values = field.allowed_values.as_ref().is_some_and(|v| !v.is_empty());
            if has_values && !matches!(field.dtype, Dtype::String | Dtype::Category) {
                warnings.push(ValidationFinding {
                    code: "W003",
                    message: format!(
                        "field '{}': allowed_values compared as text for dtype {}",
                        field.name, field.dtype
                    ),
                });
            }
        }
    }

    fn check_empty_schema(config: &AuditConfig, warnings: &mut Vec<ValidationFinding>) {
        if config.schema.is_empty() {
            warnings.push(ValidationFinding {
                code: "W004",
                message: "schema is empty; only rules and primary key will be checked".to_string(),
            });
        }
    }
}
