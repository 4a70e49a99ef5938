//! Application state.

use std::sync::Arc;

use vinsight_pipeline::{AnalysisOrchestrator, IngestionService};
use vinsight_storage::MediaStore;

use crate::config::ApiConfig;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub ingestion: Arc<IngestionService>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    /// Name of the configured chat backend, reported by `/health`
    pub backend_name: &'static str,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        ingestion: IngestionService,
        orchestrator: AnalysisOrchestrator,
        backend_name: &'static str,
    ) -> Self {
        Self {
            config,
            ingestion: Arc::new(ingestion),
            orchestrator: Arc::new(orchestrator),
            backend_name,
        }
    }

    /// The media store shared by ingestion and analysis.
    pub fn store(&self) -> &MediaStore {
        self.ingestion.store()
    }
}
