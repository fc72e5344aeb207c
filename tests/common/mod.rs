#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use wisata_rec::services::artifacts::{
    ArtifactStore, ITEM_FEATURES_FILE, ITEM_FEATURE_MAP_FILE, ITEM_ID_MAP_FILE, MODEL_FILE,
    USER_FEATURES_FILE, USER_FEATURE_MAP_FILE, USER_ID_MAP_FILE, WISATA_DATA_FILE,
};
use wisata_rec::services::catalog::CatalogSettings;
use wisata_rec::{AppState, Config};

pub const SCENARIO_CSV: &str = "Place_Id,Place_Name,Category,City,Price,Rating,Description\n\
W1,Beach,Bahari,Malang,10000,,Pantai berpasir putih\n\
W2,Cave,Alam,Pacitan,5000,4.5,Goa kapur\n";

/// Artifact directory, removed when the fixture is dropped.
pub struct Fixture {
    temp_dir: TempDir,
}

pub fn identity(n: usize) -> Value {
    let mut data = vec![0.0f32; n * n];
    for i in 0..n {
        data[i * n + i] = 1.0;
    }
    json!({ "format": "dense", "rows": n, "cols": n, "data": data })
}

/// One user and one item per score; each item's embedding is its score, so
/// the cold-start user sees exactly `scores`.
pub fn model_for(scores: &[f32]) -> Value {
    json!({
        "user_embeddings": [[1.0]],
        "user_biases": [0.0],
        "item_embeddings": scores.iter().map(|s| vec![*s]).collect::<Vec<_>>(),
        "item_biases": vec![0.0; scores.len()],
    })
}

pub fn id_map(ids: &[&str]) -> Value {
    let map: serde_json::Map<String, Value> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.to_string(), json!(i)))
        .collect();
    Value::Object(map)
}

impl Fixture {
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self { temp_dir }
    }

    /// Items `ids` scored with `scores` by the cold-start user, joined
    /// against `csv`.
    pub fn with_items(ids: &[&str], scores: &[f32], csv: &str) -> Self {
        assert_eq!(ids.len(), scores.len());
        let fixture = Self::empty();
        fixture.write_json(MODEL_FILE, &model_for(scores));
        fixture.write_json(USER_FEATURES_FILE, &identity(1));
        fixture.write_json(ITEM_FEATURES_FILE, &identity(ids.len()));
        fixture.write_json(USER_ID_MAP_FILE, &id_map(&["U1"]));
        fixture.write_json(ITEM_ID_MAP_FILE, &id_map(ids));
        fixture.write_json(USER_FEATURE_MAP_FILE, &id_map(&["U1"]));
        fixture.write_json(ITEM_FEATURE_MAP_FILE, &id_map(ids));
        fixture.write(WISATA_DATA_FILE, csv);
        fixture
    }

    /// W1 "Beach" without a rating scored 0.2, W2 "Cave" rated 4.5 scored 0.9.
    pub fn scenario() -> Self {
        Self::with_items(&["W1", "W2"], &[0.2, 0.9], SCENARIO_CSV)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) {
        fs::write(self.path().join(name), contents).expect("write fixture file");
    }

    pub fn write_json(&self, name: &str, value: &Value) {
        self.write(name, &value.to_string());
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.path().join(name)).expect("remove fixture file");
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(self.path(), CatalogSettings::default())
    }

    pub fn state(&self) -> AppState {
        let mut config = Config::default();
        config.artifacts.model_dir = Some(self.path().to_path_buf());
        config.server.static_dir = self.path().join("frontend");
        AppState::new(config)
    }
}

