use verdict::{Orchestrator, ProgressReader};

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub reader: ProgressReader,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let reader = orchestrator.progress_reader();
        Self {
            orchestrator,
            reader,
        }
    }
}
