//! Ordered registry of detection models consulted for every job.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Describes one detection unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ModelDescriptor {
    pub name: String,
    pub version: String,
    /// Free-form specialty tag, e.g. `face`, `voice`, `temporal`.
    pub specialty: String,
}

impl ModelDescriptor {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        specialty: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            specialty: specialty.into(),
        }
    }
}

/// Immutable, cheaply clonable list of model descriptors.
///
/// Iteration order is the configured order.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Arc<[ModelDescriptor]>,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self {
            models: models.into(),
        }
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.name == name)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(default_models())
    }
}

/// Built-in model list used when the configuration does not provide one.
pub fn default_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new("FaceForensics Detector", "2.1.0", "face"),
        ModelDescriptor::new("GAN Artifact Scanner", "1.4.2", "gan"),
        ModelDescriptor::new("Temporal Consistency Net", "1.2.0", "temporal"),
        ModelDescriptor::new("VoiceGuard", "3.0.1", "voice"),
        ModelDescriptor::new("Metadata Forensics", "1.0.3", "metadata"),
    ]
}
