use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Loads the config at `path`, falling back to defaults when the file is absent.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        log::info!(
            "No config file at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }
    load_config(path)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    match config.fetcher.command.first() {
        Some(program) if !program.trim().is_empty() => {}
        _ => {
            return Err(ConfigError::Validation {
                message: "fetcher.command must name a program".to_string(),
            });
        }
    }

    if config.fetcher.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "fetcher.timeout_secs must be greater than zero".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.fetcher.command, vec!["npm", "run", "start"]);
        assert_eq!(config.fetcher.timeout_secs, 300);
        assert_eq!(config.jobs.cleanup_days, 7);
        assert_eq!(config.jobs.user_jobs_limit, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_config() {
        let config = load_config_from_str(
            r#"{
                "version": "1.0",
                "database_path": "/var/lib/adwatch/jobs.db",
                "fetcher": {
                    "working_dir": "/opt/fetcher",
                    "command": ["node", "dist/index.js"],
                    "timeout_secs": 120,
                    "required_files": []
                },
                "jobs": { "cleanup_days": 30, "user_jobs_limit": 25 },
                "logging": { "level": "debug", "json": true }
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.resolved_database_path(),
            Some(PathBuf::from("/var/lib/adwatch/jobs.db"))
        );
        assert_eq!(config.fetcher.working_dir, PathBuf::from("/opt/fetcher"));
        assert_eq!(config.fetcher.command, vec!["node", "dist/index.js"]);
        assert!(config.fetcher.required_files.is_empty());
        assert_eq!(config.jobs.cleanup_days, 30);
        assert!(config.logging.json);
    }

    #[test]
    fn test_schema_rejects_unknown_fields() {
        let err = load_config_from_str(r#"{ "version": "1.0", "port": 8080 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_schema_rejects_zero_timeout() {
        let err = load_config_from_str(r#"{ "version": "1.0", "fetcher": { "timeout_secs": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let err = load_config_from_str(r#"{ "version": "2.0" }"#).unwrap_err();
        assert!(err.to_string().contains("Unsupported config version"));
    }

    #[test]
    fn test_rejects_empty_command() {
        let err = load_config_from_str(r#"{ "version": "1.0", "fetcher": { "command": [] } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("fetcher.command"));
    }

    #[test]
    fn test_rejects_invalid_json() {
        let err = load_config_from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "version": "1.0", "jobs": { "cleanup_days": 1 } }"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.jobs.cleanup_days, 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert!(matches!(
            load_config(&path).unwrap_err(),
            ConfigError::ReadFile { .. }
        ));
        assert_eq!(load_config_or_default(&path).unwrap(), Config::default());
    }
}
