//! Builders and fake detection units for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use verdict::{
    ContentItem, Detection, DetectionType, DetectionUnit, FailurePolicy, ModelDescriptor,
    ModelRegistry, OrchestratorSettings, TaskError,
};

/// Registry with one generic model per name, in the given order.
pub fn registry_of(names: &[&str]) -> ModelRegistry {
    ModelRegistry::new(
        names
            .iter()
            .map(|name| ModelDescriptor::new(*name, "1.0.0", "metadata"))
            .collect(),
    )
}

/// Builder for `OrchestratorSettings` tuned for fast tests.
pub struct SettingsBuilder {
    settings: OrchestratorSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        let mut settings = OrchestratorSettings::default();
        settings.retry.base_delay = std::time::Duration::from_millis(1);
        Self { settings }
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.settings.max_concurrent_tasks = n;
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.settings.failure_policy = policy;
        self
    }

    pub fn task_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.settings.task_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> OrchestratorSettings {
        self.settings
    }
}

/// Detection unit whose invocations block until the test releases them.
///
/// Each model has its own gate; `release` lets exactly one invocation of
/// that model finish with its configured outcome.
pub struct GatedDetector {
    gates: HashMap<String, Arc<Semaphore>>,
    outcomes: HashMap<String, Result<Detection, TaskError>>,
}

impl GatedDetector {
    pub fn new(registry: &ModelRegistry) -> Self {
        let gates = registry
            .models()
            .iter()
            .map(|m| (m.name.clone(), Arc::new(Semaphore::new(0))))
            .collect();
        Self {
            gates,
            outcomes: HashMap::new(),
        }
    }

    pub fn flagged(mut self, model: &str, confidence: f64) -> Self {
        self.outcomes.insert(
            model.to_string(),
            Ok(Detection::new(true, confidence, DetectionType::Synthetic)),
        );
        self
    }

    pub fn failing(mut self, model: &str) -> Self {
        self.outcomes.insert(
            model.to_string(),
            Err(TaskError::Unreachable {
                model: model.to_string(),
                reason: "connection refused".to_string(),
            }),
        );
        self
    }

    pub fn release(&self, model: &str) {
        if let Some(gate) = self.gates.get(model) {
            gate.add_permits(1);
        }
    }

    pub fn release_all(&self) {
        for gate in self.gates.values() {
            gate.add_permits(1);
        }
    }
}

#[async_trait]
impl DetectionUnit for GatedDetector {
    async fn detect(
        &self,
        model: &ModelDescriptor,
        _content: &ContentItem,
    ) -> Result<Detection, TaskError> {
        let gate = self.gates.get(&model.name).ok_or_else(|| TaskError::Failed {
            model: model.name.clone(),
            reason: "no gate configured".to_string(),
        })?;
        let _permit = gate.acquire().await.map_err(|e| TaskError::Failed {
            model: model.name.clone(),
            reason: e.to_string(),
        })?;

        self.outcomes
            .get(&model.name)
            .cloned()
            .unwrap_or_else(|| Ok(Detection::new(false, 75.0, DetectionType::Authentic)))
    }
}
