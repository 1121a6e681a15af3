use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
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

/// Semantic checks the schema cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.models.is_empty() {
        return Err(ConfigError::Validation {
            message: "At least one model must be registered".to_string(),
        });
    }

    let mut names = HashSet::new();
    for model in &config.models {
        if model.name.trim().is_empty() {
            return Err(ConfigError::InvalidModel {
                name: model.name.clone(),
                reason: "Model name must not be empty".to_string(),
            });
        }
        if model.version.trim().is_empty() {
            return Err(ConfigError::InvalidModel {
                name: model.name.clone(),
                reason: "Model version must not be empty".to_string(),
            });
        }
        if !names.insert(model.name.as_str()) {
            return Err(ConfigError::InvalidModel {
                name: model.name.clone(),
                reason: "Duplicate model name".to_string(),
            });
        }
    }

    if config.orchestrator.max_concurrent_tasks == 0 {
        return Err(ConfigError::Validation {
            message: "orchestrator.max_concurrent_tasks must be positive".to_string(),
        });
    }

    if config.supervisor.interval_secs == 0 || config.supervisor.stuck_job_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "supervisor intervals must be positive".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use crate::orchestrator::FailurePolicy;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();
        assert_eq!(config.models.len(), 5);
        assert_eq!(config.models[0].name, "FaceForensics Detector");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.orchestrator.failure_policy, FailurePolicy::FailFast);
        assert!(config.orchestrator.max_concurrent_tasks >= 1);
        assert_eq!(config.supervisor.stuck_job_timeout_secs, 600);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.database_path().is_some());
    }

    #[test]
    fn test_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "database_path": "/var/lib/verdict/verdict.db",
            "server": { "host": "0.0.0.0", "port": 9000 },
            "orchestrator": {
                "max_concurrent_tasks": 2,
                "failure_policy": "degrade",
                "task_timeout_secs": 30,
                "persistence": { "max_retries": 5, "base_delay_ms": 50 }
            },
            "supervisor": { "stuck_job_timeout_secs": 120, "interval_secs": 10 },
            "detector": { "simulated_latency_ms": 0 },
            "logging": { "level": "debug", "format": "json" },
            "models": [
                { "name": "VoiceGuard", "version": "3.0.1", "specialty": "voice" },
                { "name": "FaceForensics Detector", "version": "2.1.0", "specialty": "face" }
            ]
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.detector.simulated_latency_ms, 0);

        let registry = config.registry();
        assert_eq!(registry.models()[0].name, "VoiceGuard");
        assert_eq!(registry.models()[1].name, "FaceForensics Detector");

        let settings = config.orchestrator_settings();
        assert_eq!(settings.max_concurrent_tasks, 2);
        assert_eq!(settings.failure_policy, FailurePolicy::Degrade);
        assert_eq!(settings.task_timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.retry.base_delay, Duration::from_millis(50));

        assert_eq!(
            config.database_path().unwrap(),
            std::path::PathBuf::from("/var/lib/verdict/verdict.db")
        );
    }

    #[test]
    fn test_schema_rejects_unknown_policy() {
        let result = load_config_from_str(
            r#"{ "version": "1.0", "orchestrator": { "failure_policy": "retry_forever" } }"#,
        );
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_schema_rejects_unknown_field() {
        let result = load_config_from_str(r#"{ "version": "1.0", "workers": 4 }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_schema_rejects_wrong_version() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_empty_registry_rejected() {
        let result = load_config_from_str(r#"{ "version": "1.0", "models": [] }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let result = load_config_from_str(
            r#"{
                "version": "1.0",
                "models": [
                    { "name": "A", "version": "1", "specialty": "face" },
                    { "name": "A", "version": "2", "specialty": "gan" }
                ]
            }"#,
        );
        match result {
            Err(ConfigError::InvalidModel { name, reason }) => {
                assert_eq!(name, "A");
                assert!(reason.contains("Duplicate"));
            }
            other => panic!("expected InvalidModel, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_model_version_rejected() {
        let result = load_config_from_str(
            r#"{ "version": "1.0", "models": [ { "name": "A", "version": " ", "specialty": "face" } ] }"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidModel { .. })));
    }

    #[test]
    fn test_zero_concurrency_rejected_semantically() {
        let mut config = Config::default();
        config.orchestrator.max_concurrent_tasks = 0;
        assert!(validate_config(&config).is_err());
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            load_config_from_str("{ not json"),
            Err(ConfigError::ParseJson(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "version": "1.0", "server": {{ "port": 7070 }} }}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 7070);

        let missing = load_config("/definitely/not/here.json");
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
    }
}
