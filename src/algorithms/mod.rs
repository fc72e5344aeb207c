pub mod matrix;

pub use matrix::{FeatureMatrix, MatrixError};

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::Deserialize;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoringError {
    #[error("{side} feature matrix has {found} columns but the model expects {expected}")]
    ShapeMismatch {
        side: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("user index {index} out of range for {rows} user feature rows")]
    UserOutOfRange { index: usize, rows: usize },

    #[error("item index {index} out of range for {rows} item feature rows")]
    ItemOutOfRange { index: usize, rows: usize },

    #[error("model returned {found} scores for {expected} items")]
    ScoreCount { expected: usize, found: usize },
}

/// Scoring capability of a pre-trained recommendation model.
///
/// Implementations return one score per entry of `item_indices`, in the same
/// order, for the user at `user_index`.
pub trait Scorer: Send + Sync {
    fn predict(
        &self,
        user_index: usize,
        item_indices: &[usize],
        user_features: &FeatureMatrix,
        item_features: &FeatureMatrix,
    ) -> Result<Vec<f32>, ScoringError>;
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ModelError {
    #[error("{0} embeddings are ragged")]
    Ragged(&'static str),

    #[error("{side} biases hold {found} entries for {expected} embedding rows")]
    BiasLength {
        side: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("user embeddings have {user} components, item embeddings have {item}")]
    Components { user: usize, item: usize },
}

#[derive(Debug, Clone, Deserialize)]
struct FactorModelRepr {
    user_embeddings: Vec<Vec<f32>>,
    user_biases: Vec<f32>,
    item_embeddings: Vec<Vec<f32>>,
    item_biases: Vec<f32>,
}

/// Hybrid factorization model exported from training: one embedding and one
/// bias per feature column. An entity's representation is the feature-weighted
/// sum of its features' embeddings.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "FactorModelRepr")]
pub struct FactorModel {
    user_embeddings: Array2<f32>,
    user_biases: Array1<f32>,
    item_embeddings: Array2<f32>,
    item_biases: Array1<f32>,
}

impl FactorModel {
    pub fn new(
        user_embeddings: Array2<f32>,
        user_biases: Array1<f32>,
        item_embeddings: Array2<f32>,
        item_biases: Array1<f32>,
    ) -> Result<Self, ModelError> {
        if user_biases.len() != user_embeddings.nrows() {
            return Err(ModelError::BiasLength {
                side: "user",
                expected: user_embeddings.nrows(),
                found: user_biases.len(),
            });
        }
        if item_biases.len() != item_embeddings.nrows() {
            return Err(ModelError::BiasLength {
                side: "item",
                expected: item_embeddings.nrows(),
                found: item_biases.len(),
            });
        }
        if user_embeddings.ncols() != item_embeddings.ncols() {
            return Err(ModelError::Components {
                user: user_embeddings.ncols(),
                item: item_embeddings.ncols(),
            });
        }

        Ok(Self {
            user_embeddings,
            user_biases,
            item_embeddings,
            item_biases,
        })
    }

    pub fn components(&self) -> usize {
        self.item_embeddings.ncols()
    }

    pub fn user_feature_count(&self) -> usize {
        self.user_embeddings.nrows()
    }

    pub fn item_feature_count(&self) -> usize {
        self.item_embeddings.nrows()
    }
}

fn stack_rows(side: &'static str, rows: Vec<Vec<f32>>) -> Result<Array2<f32>, ModelError> {
    let n = rows.len();
    let dim = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|row| row.len() != dim) {
        return Err(ModelError::Ragged(side));
    }
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n, dim), flat).map_err(|_| ModelError::Ragged(side))
}

impl TryFrom<FactorModelRepr> for FactorModel {
    type Error = ModelError;

    fn try_from(repr: FactorModelRepr) -> Result<Self, Self::Error> {
        Self::new(
            stack_rows("user", repr.user_embeddings)?,
            Array1::from(repr.user_biases),
            stack_rows("item", repr.item_embeddings)?,
            Array1::from(repr.item_biases),
        )
    }
}

impl Scorer for FactorModel {
    fn predict(
        &self,
        user_index: usize,
        item_indices: &[usize],
        user_features: &FeatureMatrix,
        item_features: &FeatureMatrix,
    ) -> Result<Vec<f32>, ScoringError> {
        if user_features.cols() != self.user_feature_count() {
            return Err(ScoringError::ShapeMismatch {
                side: "user",
                expected: self.user_feature_count(),
                found: user_features.cols(),
            });
        }
        if item_features.cols() != self.item_feature_count() {
            return Err(ScoringError::ShapeMismatch {
                side: "item",
                expected: self.item_feature_count(),
                found: item_features.cols(),
            });
        }
        if user_index >= user_features.rows() {
            return Err(ScoringError::UserOutOfRange {
                index: user_index,
                rows: user_features.rows(),
            });
        }
        if let Some(&index) = item_indices.iter().find(|&&i| i >= item_features.rows()) {
            return Err(ScoringError::ItemOutOfRange {
                index,
                rows: item_features.rows(),
            });
        }

        let user_row = user_features.row(user_index);
        let user_repr = user_row.dot(&self.user_embeddings);
        let user_bias = user_row.dot(&self.user_biases);

        let scores = item_indices
            .par_iter()
            .map(|&index| {
                let item_row = item_features.row(index);
                let item_repr = item_row.dot(&self.item_embeddings);
                item_repr.dot(&user_repr) + item_row.dot(&self.item_biases) + user_bias
            })
            .collect();

        Ok(scores)
    }
}
