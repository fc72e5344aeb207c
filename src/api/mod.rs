use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::validation::{validate_count, validate_user_profile};
use crate::AppState;

async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.recommendation_service.health_check())
}

async fn get_recommendations(
    State(state): State<AppState>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
    body: Result<Json<UserProfile>, JsonRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let Query(params) = query?;
    let count = validate_count(params.n, &state.config.recommendation)?;
    let Json(user_profile) = body?;
    validate_user_profile(&user_profile)?;

    match state
        .recommendation_service
        .get_recommendations(&user_profile, count)
        .await
    {
        Ok(recommendations) => Ok(Json(RecommendationResponse::new(
            user_profile,
            recommendations,
        ))),
        Err(e) => {
            error!("Failed to get recommendations: {}", e);
            Err(e)
        }
    }
}

async fn get_all_wisata(State(state): State<AppState>) -> AppResult<Json<Vec<WisataRecommendation>>> {
    let wisata = state.recommendation_service.get_all_wisata().await?;
    info!("Listing {} wisata", wisata.len());
    Ok(Json(wisata))
}

async fn get_wisata_detail(
    State(state): State<AppState>,
    Path(wisata_id): Path<String>,
) -> AppResult<Json<WisataRecommendation>> {
    state
        .recommendation_service
        .get_wisata_info(&wisata_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Wisata not found".to_string()))
}

async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let path = state.config.server.static_dir.join("templates").join("index.html");
    tokio::fs::read_to_string(&path)
        .await
        .map(Html)
        .map_err(|e| {
            error!("Failed to read {}: {}", path.display(), e);
            AppError::NotFound("Frontend not found".to_string())
        })
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/recommend", post(get_recommendations))
        .route("/wisata", get(get_all_wisata))
        .route("/wisata/:wisata_id", get(get_wisata_detail))
        .route("/health", get(health_check));

    let static_files = ServeDir::new(state.config.server.static_dir.join("static"));

    Router::new()
        .route("/", get(index))
        .nest("/api", api)
        .nest_service("/static", static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
