pub mod algorithms;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::*;

use std::sync::Arc;

use services::artifacts::ArtifactStore;
use services::recommendation::RecommendationService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub artifacts: Arc<ArtifactStore>,
    pub recommendation_service: Arc<RecommendationService>,
}

impl AppState {
    /// State with a lazily loaded store over the configured model directory.
    pub fn new(config: Config) -> Self {
        let store = ArtifactStore::new(
            config.model_dir(),
            config.recommendation.catalog_settings(),
        );
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: ArtifactStore) -> Self {
        let config = Arc::new(config);
        let artifacts = Arc::new(store);

        let recommendation_service = Arc::new(RecommendationService::new(
            artifacts.clone(),
            config.clone(),
        ));

        Self {
            config,
            artifacts,
            recommendation_service,
        }
    }
}

/// Installs the global subscriber. `level` overrides `RUST_LOG`; without
/// either, `info` is used.
pub fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
