use axum::{extract::State, routing::get, Json, Router};
use tracing::{info, instrument};

use super::{
    dto::{ProfileProteinTarget, ProfileRequest, ProfileResponse},
    repo_types::{Profile, ProfileFields},
};
use crate::{
    auth::{extractors::AuthUser, repo_types::User},
    error::AppError,
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(put_profile))
        .route("/profile/protein", get(get_protein_target))
}

async fn load_user(state: &AppState, user_id: uuid::Uuid) -> Result<User, AppError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = load_user(&state, user_id).await?;
    let profile = Profile::find(&state.db, user_id).await?;
    let (fields, updated_at) = match profile {
        Some(p) => (p.fields, Some(p.updated_at)),
        None => (ProfileFields::default(), None),
    };
    Ok(Json(ProfileResponse {
        user_id,
        email: user.email,
        is_verified: user.is_verified,
        fields,
        updated_at,
    }))
}

#[instrument(skip(state, payload))]
pub async fn put_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let fields = payload.validate()?;
    let user = load_user(&state, user_id).await?;
    let profile = fields.upsert(&state.db, user_id).await?;
    info!(%user_id, "profile updated");
    Ok(Json(ProfileResponse {
        user_id,
        email: user.email,
        is_verified: user.is_verified,
        fields: profile.fields,
        updated_at: Some(profile.updated_at),
    }))
}

#[instrument(skip(state))]
pub async fn get_protein_target(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileProteinTarget>, AppError> {
    let fields = Profile::find(&state.db, user_id)
        .await?
        .map(|p| p.fields)
        .unwrap_or_default();
    Ok(Json(ProfileProteinTarget::from_fields(&fields)))
}
