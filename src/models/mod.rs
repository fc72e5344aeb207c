use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile submitted with a recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: Option<String>,
    pub umur: i64,
    pub asal_kota: String,
    pub jenis_kelamin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WisataRecommendation {
    pub place_id: String,
    pub nama_wisata: String,
    pub kategori: String,
    pub harga: i64,
    pub lokasi: String,
    pub rating: f64,
    pub score: f32,
    pub deskripsi: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_profile: UserProfile,
    pub recommendations: Vec<WisataRecommendation>,
    pub total_recommendations: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationQuery {
    pub n: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub total_wisata: usize,
}

impl UserProfile {
    pub fn new(umur: i64, asal_kota: impl Into<String>, jenis_kelamin: impl Into<String>) -> Self {
        Self {
            user_id: None,
            umur,
            asal_kota: asal_kota.into(),
            jenis_kelamin: jenis_kelamin.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Feature tokens in the naming scheme of the user feature map.
    pub fn feature_tokens(&self) -> Vec<String> {
        vec![
            format!("umur_{}", self.umur),
            format!("asal_kota_{}", self.asal_kota),
            format!("jenis_kelamin_{}", self.jenis_kelamin),
        ]
    }
}

impl RecommendationResponse {
    pub fn new(user_profile: UserProfile, recommendations: Vec<WisataRecommendation>) -> Self {
        Self {
            user_profile,
            total_recommendations: recommendations.len(),
            recommendations,
            generated_at: Utc::now(),
        }
    }
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
