//! Loading of the trained model and its lookup tables.
//!
//! The artifact directory is a closed contract: all eight files must be
//! present and their index spaces must agree before the service is ready.
//! The loaded [`Artifacts`] snapshot is shared read-only for the lifetime of
//! the process.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::algorithms::{FactorModel, FeatureMatrix, Scorer, ScoringError};
use crate::services::catalog::{CatalogError, CatalogSettings, VenueCatalog};

pub const MODEL_FILE: &str = "lightfm_model.json";
pub const USER_FEATURES_FILE: &str = "user_features.json";
pub const ITEM_FEATURES_FILE: &str = "item_features.json";
pub const USER_ID_MAP_FILE: &str = "user_id_map.json";
pub const ITEM_ID_MAP_FILE: &str = "item_id_map.json";
pub const USER_FEATURE_MAP_FILE: &str = "user_feature_map.json";
pub const ITEM_FEATURE_MAP_FILE: &str = "item_feature_map.json";
pub const WISATA_DATA_FILE: &str = "wisata_data.csv";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{artifact} not found: {}", path.display())]
    NotFound {
        artifact: &'static str,
        path: PathBuf,
    },

    #[error("failed to read {artifact} from {}: {source}", path.display())]
    Io {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to deserialize {artifact} from {}: {reason}", path.display())]
    Deserialization {
        artifact: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("inconsistent artifacts: {0}")]
    Inconsistent(String),

    #[error("artifact loader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Bijection between external string ids and zero-based internal indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdMap {
    by_id: HashMap<String, usize>,
    by_index: HashMap<usize, String>,
}

impl IdMap {
    pub fn from_pairs<I>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, usize)>,
    {
        let mut map = Self::default();
        for (id, index) in pairs {
            if let Some(existing) = map.by_index.get(&index) {
                return Err(format!(
                    "index {} is mapped to both '{}' and '{}'",
                    index, existing, id
                ));
            }
            if map.by_id.contains_key(&id) {
                return Err(format!("id '{}' is mapped twice", id));
            }
            map.by_index.insert(index, id.clone());
            map.by_id.insert(id, index);
        }
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn id_of(&self, index: usize) -> Option<&str> {
        self.by_index.get(&index).map(String::as_str)
    }

    pub fn max_index(&self) -> Option<usize> {
        self.by_index.keys().copied().max()
    }

    /// True when the indices are exactly `0..n`.
    pub fn covers(&self, n: usize) -> bool {
        self.len() == n && self.max_index().map_or(true, |max| max + 1 == n)
    }
}

/// Feature token to feature-matrix column.
pub type FeatureMap = HashMap<String, usize>;

/// Everything the recommendation path reads, loaded once.
pub struct Artifacts {
    pub model: Arc<dyn Scorer>,
    pub user_features: FeatureMatrix,
    pub item_features: FeatureMatrix,
    pub user_ids: IdMap,
    pub item_ids: IdMap,
    pub user_feature_map: FeatureMap,
    pub item_feature_map: FeatureMap,
    pub catalog: VenueCatalog,
}

impl std::fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifacts")
            .field("user_features", &self.user_features.shape())
            .field("item_features", &self.item_features.shape())
            .field("user_ids", &self.user_ids.len())
            .field("item_ids", &self.item_ids.len())
            .field("user_feature_map", &self.user_feature_map.len())
            .field("item_feature_map", &self.item_feature_map.len())
            .field("catalog", &self.catalog.len())
            .finish()
    }
}

impl Artifacts {
    /// Checks that the id maps and feature maps agree with the matrices.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let item_rows = self.item_features.rows();
        if !self.item_ids.covers(item_rows) {
            return Err(ArtifactError::Inconsistent(format!(
                "item id map holds {} ids (max index {:?}) but item features have {} rows",
                self.item_ids.len(),
                self.item_ids.max_index(),
                item_rows
            )));
        }

        let user_rows = self.user_features.rows();
        if let Some(max) = self.user_ids.max_index().filter(|&max| max >= user_rows) {
            return Err(ArtifactError::Inconsistent(format!(
                "user id map references index {} but user features have {} rows",
                max, user_rows
            )));
        }

        check_feature_map("user", &self.user_feature_map, self.user_features.cols())?;
        check_feature_map("item", &self.item_feature_map, self.item_features.cols())?;
        Ok(())
    }

    pub fn item_count(&self) -> usize {
        self.item_features.rows()
    }

    /// Scores every known item, in ascending index order, for `user_index`.
    pub fn score_all(&self, user_index: usize) -> Result<Vec<f32>, ScoringError> {
        let item_indices: Vec<usize> = (0..self.item_count()).collect();
        let scores = self.model.predict(
            user_index,
            &item_indices,
            &self.user_features,
            &self.item_features,
        )?;

        if scores.len() != item_indices.len() {
            return Err(ScoringError::ScoreCount {
                expected: item_indices.len(),
                found: scores.len(),
            });
        }
        Ok(scores)
    }

    pub fn known_user_features(&self, tokens: &[String]) -> usize {
        tokens
            .iter()
            .filter(|token| self.user_feature_map.contains_key(token.as_str()))
            .count()
    }
}

fn check_feature_map(side: &str, map: &FeatureMap, cols: usize) -> Result<(), ArtifactError> {
    match map.iter().find(|(_, &col)| col >= cols) {
        Some((token, col)) => Err(ArtifactError::Inconsistent(format!(
            "{} feature '{}' maps to column {} but the matrix has {} columns",
            side, token, col, cols
        ))),
        None => Ok(()),
    }
}

fn require(dir: &Path, artifact: &'static str, file: &str) -> Result<PathBuf, ArtifactError> {
    let path = dir.join(file);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ArtifactError::NotFound { artifact, path })
    }
}

fn open(artifact: &'static str, path: &Path) -> Result<BufReader<File>, ArtifactError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ArtifactError::Io {
            artifact,
            path: path.to_path_buf(),
            source,
        })
}

fn read_json<T: DeserializeOwned>(
    dir: &Path,
    artifact: &'static str,
    file: &str,
) -> Result<T, ArtifactError> {
    let path = require(dir, artifact, file)?;
    serde_json::from_reader(open(artifact, &path)?).map_err(|e| ArtifactError::Deserialization {
        artifact,
        path,
        reason: e.to_string(),
    })
}

fn read_id_map(dir: &Path, artifact: &'static str, file: &str) -> Result<IdMap, ArtifactError> {
    let pairs: HashMap<String, usize> = read_json(dir, artifact, file)?;
    IdMap::from_pairs(pairs)
        .map_err(|reason| ArtifactError::Inconsistent(format!("{}: {}", artifact, reason)))
}

fn read_catalog(dir: &Path, settings: &CatalogSettings) -> Result<VenueCatalog, ArtifactError> {
    let artifact = "wisata data";
    let path = require(dir, artifact, WISATA_DATA_FILE)?;
    VenueCatalog::from_reader(open(artifact, &path)?, settings).map_err(|e| match &e {
        CatalogError::DuplicateId(_) => ArtifactError::Inconsistent(format!("{}: {}", artifact, e)),
        _ => ArtifactError::Deserialization {
            artifact,
            path,
            reason: e.to_string(),
        },
    })
}

/// Reads and validates every artifact in `dir`. Blocking.
pub fn load_from_dir(dir: &Path, settings: &CatalogSettings) -> Result<Artifacts, ArtifactError> {
    info!("Loading model artifacts from: {}", dir.display());

    if !dir.is_dir() {
        return Err(ArtifactError::NotFound {
            artifact: "models directory",
            path: dir.to_path_buf(),
        });
    }

    let model: FactorModel = read_json(dir, "model", MODEL_FILE)?;
    info!(
        "Model loaded: {} components, {} user / {} item features",
        model.components(),
        model.user_feature_count(),
        model.item_feature_count()
    );

    let user_features: FeatureMatrix = read_json(dir, "user features", USER_FEATURES_FILE)?;
    info!("User features loaded: {:?}", user_features.shape());
    let item_features: FeatureMatrix = read_json(dir, "item features", ITEM_FEATURES_FILE)?;
    info!("Item features loaded: {:?}", item_features.shape());

    let user_ids = read_id_map(dir, "user id map", USER_ID_MAP_FILE)?;
    info!("User ID map loaded: {} users", user_ids.len());
    let item_ids = read_id_map(dir, "item id map", ITEM_ID_MAP_FILE)?;
    info!("Item ID map loaded: {} items", item_ids.len());

    let user_feature_map: FeatureMap = read_json(dir, "user feature map", USER_FEATURE_MAP_FILE)?;
    info!("User feature map loaded: {} features", user_feature_map.len());
    let item_feature_map: FeatureMap = read_json(dir, "item feature map", ITEM_FEATURE_MAP_FILE)?;
    info!("Item feature map loaded: {} features", item_feature_map.len());

    let catalog = read_catalog(dir, settings)?;
    info!(
        "Wisata data loaded: {} venues keyed by '{}'",
        catalog.len(),
        catalog.id_column()
    );

    let artifacts = Artifacts {
        model: Arc::new(model),
        user_features,
        item_features,
        user_ids,
        item_ids,
        user_feature_map,
        item_feature_map,
        catalog,
    };
    artifacts.validate()?;

    info!("All model artifacts loaded, total wisata: {}", artifacts.catalog.len());
    Ok(artifacts)
}

/// Process-wide, lazily initialized artifact snapshot.
///
/// Only one load runs at a time; callers arriving during a load wait for
/// its result. A failed load leaves the store empty, so the next caller
/// tries again.
#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    settings: CatalogSettings,
    cell: OnceCell<Arc<Artifacts>>,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, settings: CatalogSettings) -> Self {
        Self {
            dir: dir.into(),
            settings,
            cell: OnceCell::new(),
        }
    }

    /// A store that is ready without touching the filesystem.
    pub fn preloaded(artifacts: Artifacts) -> Result<Self, ArtifactError> {
        artifacts.validate()?;
        Ok(Self {
            dir: PathBuf::new(),
            settings: CatalogSettings::default(),
            cell: OnceCell::new_with(Some(Arc::new(artifacts))),
        })
    }

    pub async fn load(&self) -> Result<Arc<Artifacts>, ArtifactError> {
        let artifacts = self
            .cell
            .get_or_try_init(|| {
                let dir = self.dir.clone();
                let settings = self.settings.clone();
                async move {
                    let loaded = tokio::task::spawn_blocking(move || load_from_dir(&dir, &settings))
                        .await?
                        .map_err(|e| {
                            error!("Error loading model: {}", e);
                            e
                        })?;
                    Ok::<_, ArtifactError>(Arc::new(loaded))
                }
            })
            .await?;
        Ok(artifacts.clone())
    }

    /// The snapshot if already loaded; never triggers a load.
    pub fn get(&self) -> Option<Arc<Artifacts>> {
        self.cell.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}
