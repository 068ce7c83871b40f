use std::sync::Arc;

use crate::services::{CatalogGateway, EngineSettings, RecommendationEngine};

/// Shared application state
///
/// Only the engine's configuration and the catalog client live here; pools,
/// feature matrices and neighbor indexes are built inside each request.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub gateway: Arc<dyn CatalogGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn CatalogGateway>, settings: EngineSettings) -> Self {
        Self {
            engine: Arc::new(RecommendationEngine::new(gateway.clone(), settings)),
            gateway,
        }
    }
}
