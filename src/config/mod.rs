mod types;
mod model;
mod validator;
mod loader;

pub use types::{AuditConfig, Dtype, RuleDefinition, SchemaField, Severity};
pub use model::{parse_comma_list, RulePatch, SchemaFieldPatch, DEFAULT_RULE_EXPRESSION};
pub use validator::{ConfigValidator, ValidationFinding, ValidationResult};
pub use loader::{load_config, save_config, ConfigFormat};
