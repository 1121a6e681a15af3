pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod runner;
pub mod sanitize;
pub mod store;
pub mod supervisor;

pub use analysis::{
    aggregate, AnalysisJob, AnalysisRequest, ContentItem, ContentKind, Detection, DetectionType,
    JobSnapshot, JobStatus, StatusChange, Summary, TaskResult, Verdict,
};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, Result, StoreError, TaskError, ValidationError, VerdictError};
pub use events::{AnalysisEvent, AnalysisEventBroadcaster};
pub use orchestrator::{FailurePolicy, JobHandle, Orchestrator, OrchestratorSettings};
pub use progress::ProgressReader;
pub use registry::{ModelDescriptor, ModelRegistry};
pub use runner::{DetectionUnit, FnDetector, SimulatedDetector, TaskRunner};
pub use store::{JobStore, MemoryJobStore, SqliteJobStore};
pub use supervisor::JobSupervisor;
