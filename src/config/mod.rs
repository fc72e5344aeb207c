use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::services::catalog::CatalogSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Frontend root holding `templates/index.html` and `static/`.
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Overrides the default `models/` directory.
    pub model_dir: Option<PathBuf>,
    pub preload: bool,
}

impl ArtifactsConfig {
    pub fn resolve_dir(&self) -> PathBuf {
        match &self.model_dir {
            Some(dir) => dir.clone(),
            None => default_model_dir(),
        }
    }
}

pub fn default_model_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("models")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub default_count: usize,
    pub max_count: usize,
    /// Placeholder user row used for every request.
    pub cold_start_user_index: usize,
    pub description_limit: usize,
    pub image_prefix: String,
}

impl RecommendationConfig {
    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            description_limit: self.description_limit,
            image_prefix: self.image_prefix.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                workers: num_cpus::get(),
                static_dir: PathBuf::from("frontend"),
            },
            artifacts: ArtifactsConfig::default(),
            recommendation: RecommendationConfig {
                default_count: 5,
                max_count: 10,
                cold_start_user_index: 0,
                description_limit: 200,
                image_prefix: "/static/images".to_string(),
            },
        }
    }
}

impl Config {
    /// Layers built-in defaults, an optional config file, then `WISATA__*`
    /// environment variables (e.g. `WISATA__SERVER__PORT=9000`).
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("WISATA").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn model_dir(&self) -> PathBuf {
        self.artifacts.resolve_dir()
    }
}
