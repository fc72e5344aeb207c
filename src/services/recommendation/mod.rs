use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::artifacts::{ArtifactStore, Artifacts};
use crate::utils::top_k_indices;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RecommendationService {
    store: Arc<ArtifactStore>,
    config: Arc<Config>,
}

impl RecommendationService {
    pub fn new(store: Arc<ArtifactStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Loads the artifacts if they are not loaded yet.
    pub async fn warm_up(&self) -> AppResult<()> {
        self.store.load().await?;
        Ok(())
    }

    /// Top `count` venues for `profile`, best first.
    ///
    /// Scoring always uses the configured cold-start user row; the profile is
    /// only logged against the user feature map.
    pub async fn get_recommendations(
        &self,
        profile: &UserProfile,
        count: usize,
    ) -> AppResult<Vec<WisataRecommendation>> {
        let artifacts = self.store.load().await?;

        let tokens = profile.feature_tokens();
        info!("Generating recommendations for: {}", tokens.join("|"));
        debug!(
            "{} of {} profile features known to the user feature map",
            artifacts.known_user_features(&tokens),
            tokens.len()
        );

        let user_index = self.config.recommendation.cold_start_user_index;
        let snapshot = artifacts.clone();
        let scores = tokio::task::spawn_blocking(move || snapshot.score_all(user_index))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(|e| {
                tracing::error!("Scoring failed for user index {}: {}", user_index, e);
                e
            })?;
        debug!("Scored {} items", scores.len());

        let recommendations = rank(&artifacts, &scores, count);
        info!("Generated {} recommendations", recommendations.len());
        Ok(recommendations)
    }

    /// Every catalog venue with a zero score, in catalog order.
    pub async fn get_all_wisata(&self) -> AppResult<Vec<WisataRecommendation>> {
        let artifacts = self.store.load().await?;
        Ok(artifacts
            .catalog
            .iter()
            .map(|venue| venue.with_score(0.0))
            .collect())
    }

    pub async fn get_wisata_info(&self, place_id: &str) -> AppResult<Option<WisataRecommendation>> {
        let artifacts = self.store.load().await?;
        Ok(artifacts.catalog.get(place_id).map(|venue| venue.with_score(0.0)))
    }

    /// Readiness as seen right now; never triggers a load.
    pub fn health_check(&self) -> HealthStatus {
        let snapshot = self.store.get();
        HealthStatus {
            status: "healthy".to_string(),
            model_loaded: snapshot.is_some(),
            total_wisata: snapshot.map_or(0, |artifacts| artifacts.catalog.len()),
        }
    }
}

/// Joins the `count` best-scoring items against the catalog.
///
/// Items without a place id or without a catalog row are dropped, so the
/// result may be shorter than `count`.
pub fn rank(artifacts: &Artifacts, scores: &[f32], count: usize) -> Vec<WisataRecommendation> {
    let mut recommendations = Vec::with_capacity(count.min(scores.len()));

    for (rank, index) in top_k_indices(scores, count).into_iter().enumerate() {
        let Some(place_id) = artifacts.item_ids.id_of(index) else {
            warn!("[{}] no place id for item index {}", rank + 1, index);
            continue;
        };

        let Some(venue) = artifacts.catalog.get(place_id) else {
            warn!("[{}] place id '{}' not in wisata data", rank + 1, place_id);
            continue;
        };

        debug!("[{}] {} | score {:.4}", rank + 1, venue.name, scores[index]);
        recommendations.push(venue.with_score(scores[index]));
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{FeatureMatrix, Scorer, ScoringError};
    use crate::services::artifacts::{FeatureMap, IdMap};
    use crate::services::catalog::{CatalogSettings, VenueCatalog};

    struct Fixed(Vec<f32>);

    impl Scorer for Fixed {
        fn predict(
            &self,
            _user_index: usize,
            item_indices: &[usize],
            _user_features: &FeatureMatrix,
            _item_features: &FeatureMatrix,
        ) -> Result<Vec<f32>, ScoringError> {
            Ok(item_indices.iter().map(|&i| self.0[i]).collect())
        }
    }

    fn artifacts(scores: Vec<f32>, item_ids: &[&str], csv: &str) -> Artifacts {
        let n = scores.len();
        Artifacts {
            model: Arc::new(Fixed(scores)),
            user_features: FeatureMatrix::identity(1),
            item_features: FeatureMatrix::identity(n),
            user_ids: IdMap::from_pairs(vec![("U1".to_string(), 0)]).unwrap(),
            item_ids: IdMap::from_pairs(
                item_ids.iter().enumerate().map(|(i, id)| (id.to_string(), i)),
            )
            .unwrap(),
            user_feature_map: FeatureMap::new(),
            item_feature_map: FeatureMap::new(),
            catalog: VenueCatalog::from_reader(csv.as_bytes(), &CatalogSettings::default()).unwrap(),
        }
    }

    fn service(artifacts: Artifacts) -> RecommendationService {
        RecommendationService::new(
            Arc::new(ArtifactStore::preloaded(artifacts).unwrap()),
            Arc::new(Config::default()),
        )
    }

    #[test]
    fn test_rank_orders_by_score() {
        let snapshot = artifacts(
            vec![0.2, 0.9],
            &["W1", "W2"],
            "Place_Id,Place_Name,Rating\nW1,Beach,\nW2,Cave,4.5\n",
        );
        let ranked = rank(&snapshot, &[0.2, 0.9], 2);

        let ids: Vec<&str> = ranked.iter().map(|r| r.place_id.as_str()).collect();
        assert_eq!(ids, vec!["W2", "W1"]);
        assert_eq!(ranked[0].score, 0.9);
        assert_eq!(ranked[1].rating, 4.0);
    }

    #[test]
    fn test_rank_skips_items_missing_from_catalog() {
        let snapshot = artifacts(
            vec![0.5, 0.8, 0.1],
            &["W1", "W9", "W3"],
            "Place_Id,Place_Name\nW1,A\nW3,C\n",
        );
        let ranked = rank(&snapshot, &[0.5, 0.8, 0.1], 3);

        let ids: Vec<&str> = ranked.iter().map(|r| r.place_id.as_str()).collect();
        assert_eq!(ids, vec!["W1", "W3"]);
    }

    #[test]
    fn test_rank_truncates_before_join() {
        let snapshot = artifacts(
            vec![0.5, 0.8, 0.1],
            &["W1", "W9", "W3"],
            "Place_Id,Place_Name\nW1,A\nW3,C\n",
        );
        // the best item is missing, so only one of the top two survives
        assert_eq!(rank(&snapshot, &[0.5, 0.8, 0.1], 2).len(), 1);
    }

    #[test]
    fn test_rank_with_unbounded_count() {
        let snapshot = artifacts(
            vec![0.2, 0.9],
            &["W1", "W2"],
            "Place_Id,Place_Name\nW1,A\nW2,B\n",
        );
        assert_eq!(rank(&snapshot, &[0.2, 0.9], usize::MAX).len(), 2);
    }

    #[tokio::test]
    async fn test_unbounded_count_returns_every_item() {
        let service = service(artifacts(
            vec![0.4, 0.1, 0.7],
            &["W1", "W2", "W3"],
            "Place_Id,Place_Name\nW1,A\nW2,B\nW3,C\n",
        ));
        let profile = UserProfile::new(30, "Kediri", "L");

        let all = service.get_recommendations(&profile, usize::MAX).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.place_id.as_str()).collect();
        assert_eq!(ids, vec!["W3", "W1", "W2"]);
    }

    #[tokio::test]
    async fn test_recommendations_are_deterministic() {
        let service = service(artifacts(
            vec![0.3, 0.3, 0.7],
            &["W1", "W2", "W3"],
            "Place_Id,Place_Name\nW1,A\nW2,B\nW3,C\n",
        ));
        let profile = UserProfile::new(25, "Surabaya", "P");

        let first = service.get_recommendations(&profile, 3).await.unwrap();
        let second = service.get_recommendations(&profile, 3).await.unwrap();
        assert_eq!(first, second);

        let ids: Vec<&str> = first.iter().map(|r| r.place_id.as_str()).collect();
        assert_eq!(ids, vec!["W3", "W1", "W2"]);
    }

    #[tokio::test]
    async fn test_profile_does_not_change_ranking() {
        let service = service(artifacts(
            vec![0.1, 0.6],
            &["W1", "W2"],
            "Place_Id,Place_Name\nW1,A\nW2,B\n",
        ));

        let young = service
            .get_recommendations(&UserProfile::new(18, "Malang", "L"), 2)
            .await
            .unwrap();
        let old = service
            .get_recommendations(&UserProfile::new(70, "Jember", "P"), 2)
            .await
            .unwrap();
        assert_eq!(young, old);
    }

    #[tokio::test]
    async fn test_catalog_lookups() {
        let service = service(artifacts(
            vec![0.1, 0.6],
            &["W1", "W2"],
            "Place_Id,Place_Name\nW1,A\nW2,B\n",
        ));

        let all = service.get_all_wisata().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.score == 0.0));

        assert_eq!(service.get_wisata_info("W2").await.unwrap().unwrap().nama_wisata, "B");
        assert!(service.get_wisata_info("W7").await.unwrap().is_none());

        let health = service.health_check();
        assert!(health.model_loaded);
        assert_eq!(health.total_wisata, 2);
    }
}
