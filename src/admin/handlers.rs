use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{Pagination, UserListItem};
use crate::{
    auth::{extractors::AdminUser, repo_types::User},
    error::AppError,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/users", get(list_users))
}

#[instrument(skip(state, admin))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<UserListItem>>, AppError> {
    let (limit, offset) = p.clamped();
    let users = User::list(&state.db, limit, offset).await?;
    info!(admin_id = %admin.id, count = users.len(), "admin listed users");
    Ok(Json(users.into_iter().map(UserListItem::from).collect()))
}
