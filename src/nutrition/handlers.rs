use axum::{routing::post, Json, Router};
use tracing::{info, instrument};

use super::{calculator::ProteinRequest, dto::ProteinRecommendation};
use crate::{error::AppError, state::AppState};

pub fn nutrition_routes() -> Router<AppState> {
    Router::new().route("/nutrition/protein", post(recommend_protein))
}

/// POST /nutrition/protein
/// Stateless: nothing is read from or written to the profile.
#[instrument(skip(payload))]
pub async fn recommend_protein(
    Json(payload): Json<ProteinRequest>,
) -> Result<Json<ProteinRecommendation>, AppError> {
    let input = payload.validate()?;
    let recommendation = ProteinRecommendation::from(input);
    info!(
        grams = recommendation.recommended_protein_g,
        goal = ?recommendation.goal,
        "protein recommendation computed"
    );
    Ok(Json(recommendation))
}
