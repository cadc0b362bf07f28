use std::fs;
use std::path::Path;
use tracing::info;
use crate::error::{AuditDeskError, Result};
use super::types::AuditConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// `.yaml`/`.yml` are YAML; everything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
            Some(ext) if ext == "yaml" || ext == "yml" => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AuditConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| AuditDeskError::Config(format!("cannot read {}: {}", path.display(), e)))?;

    let config = match ConfigFormat::from_path(path) {
        ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
        ConfigFormat::Json => serde_json::from_str(&content)?,
    };

    info!("Loaded audit config from {}", path.display());
    Ok(config)
}

pub fn save_config(config: &AuditConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = match ConfigFormat::from_path(path) {
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
    };

    fs::write(path, content)?;
    info!("Saved audit config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dtype, RuleDefinition, SchemaField, Severity};
    use tempfile::TempDir;

    fn sample_config() -> AuditConfig {
        let mut config = AuditConfig::new("customers");
        config.primary_key = Some(vec!["id".to_string()]);
        config.schema.push(SchemaField::new("id", Dtype::Integer).required());
        config.schema.push(SchemaField::new("tier", Dtype::Category).with_allowed_values(["gold", "silver"]));
        config.rules.push(RuleDefinition::new("id_positive", "id > 0", Severity::Error));
        config
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Json);
    }

    #[test]
    fn test_yaml_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.yaml");
        let config = sample_config();

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.json");
        let config = sample_config();

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_config(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, AuditDeskError::Config(_)));
    }
}
