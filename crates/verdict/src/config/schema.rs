use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::orchestrator::{FailurePolicy, OrchestratorSettings, RetryPolicy};
use crate::registry::{default_models, ModelDescriptor, ModelRegistry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Falls back to `~/.verdict/data/verdict.db` when unset.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Ordered model registry. Order is preserved end to end.
    #[serde(default = "default_models")]
    pub models: Vec<ModelDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            server: ServerConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            supervisor: SupervisorConfig::default(),
            detector: DetectorConfig::default(),
            logging: LoggingConfig::default(),
            models: default_models(),
        }
    }
}

impl Config {
    pub fn registry(&self) -> ModelRegistry {
        ModelRegistry::new(self.models.clone())
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        let orchestrator = &self.orchestrator;
        OrchestratorSettings {
            max_concurrent_tasks: orchestrator.max_concurrent_tasks,
            failure_policy: orchestrator.failure_policy,
            task_timeout: orchestrator.task_timeout_secs.map(Duration::from_secs),
            retry: RetryPolicy::new(
                orchestrator.persistence.max_retries,
                Duration::from_millis(orchestrator.persistence.base_delay_ms),
            ),
        }
    }

    /// Configured database path, or the per-user default.
    pub fn database_path(&self) -> Option<PathBuf> {
        match &self.database_path {
            Some(path) => Some(PathBuf::from(path)),
            None => crate::db::default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Per-invocation limit for a single model. Unbounded when unset.
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

fn default_max_concurrent_tasks() -> usize {
    num_cpus::get()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
            failure_policy: FailurePolicy::default(),
            task_timeout_secs: None,
            persistence: PersistenceConfig::default(),
        }
    }
}

/// Retry budget for job store writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_stuck_job_timeout_secs")]
    pub stuck_job_timeout_secs: u64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_stuck_job_timeout_secs() -> u64 {
    600
}

fn default_interval_secs() -> u64 {
    60
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            stuck_job_timeout_secs: default_stuck_job_timeout_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
}

fn default_simulated_latency_ms() -> u64 {
    500
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: default_simulated_latency_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
