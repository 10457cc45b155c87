use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        week_start_param, CompletionRequest, DaySummary, MealListQuery, MealRequest,
        MealResponse, TimeSlots, WeekScope, WeekSummary,
    },
    model::{parse_iso_date, time_slots, week_dates, MealDay},
    repo::{self, MealFilter},
    services::{day_log, week_summary},
};
use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    nutrition::calculator::ValidationErrors,
    profile::repo_types::Profile,
    state::AppState,
};

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/time-slots", get(list_time_slots))
        .route("/meals/days/:day", get(get_day))
        .route("/meals/weeks/:week_start", get(get_week))
        .route(
            "/meals/:id",
            get(get_meal).put(update_meal).delete(delete_meal),
        )
        .route("/meals/:id/completion", put(set_completion))
}

fn not_found() -> AppError {
    AppError::NotFound("Meal not found".into())
}

fn parse_day(raw: &str) -> Result<MealDay, AppError> {
    raw.parse::<MealDay>().map_err(|e| {
        let mut errors = ValidationErrors::default();
        errors.add("day", e.to_string());
        AppError::from(errors)
    })
}

/// Protein target from the caller's profile, if it holds enough data.
async fn recommended_for(state: &AppState, user_id: Uuid) -> Result<Option<u32>, AppError> {
    let profile = Profile::find(&state.db, user_id).await?;
    Ok(profile.and_then(|p| p.fields.recommended_protein()))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<MealListQuery>,
) -> Result<Json<Vec<MealResponse>>, AppError> {
    let filter = MealFilter {
        day: q.day.as_deref().map(parse_day).transpose()?,
        week_start: week_start_param(q.week_start.as_deref())?,
    };
    let meals = repo::list(&state.db, user_id, filter).await?;
    Ok(Json(meals.into_iter().map(MealResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<MealRequest>,
) -> Result<(StatusCode, HeaderMap, Json<MealResponse>), AppError> {
    let input = payload.validate()?;
    let meal = repo::insert(&state.db, user_id, &input).await?;
    info!(%user_id, meal_id = %meal.id, day = %meal.day, "meal added");

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/meals/{}", meal.id))
        .map_err(anyhow::Error::from)?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(MealResponse::from(meal))))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealResponse>, AppError> {
    let meal = repo::find(&state.db, user_id, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(MealResponse::from(meal)))
}

#[instrument(skip(state, payload))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MealRequest>,
) -> Result<Json<MealResponse>, AppError> {
    let input = payload.validate()?;
    let meal = repo::update(&state.db, user_id, id, &input)
        .await?
        .ok_or_else(not_found)?;
    info!(%user_id, meal_id = %id, "meal edited");
    Ok(Json(MealResponse::from(meal)))
}

/// PUT /meals/:id/completion. Setting the current value again is a no-op.
#[instrument(skip(state, payload))]
pub async fn set_completion(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompletionRequest>,
) -> Result<Json<MealResponse>, AppError> {
    let meal = repo::set_completed(&state.db, user_id, id, payload.completed)
        .await?
        .ok_or_else(not_found)?;
    info!(%user_id, meal_id = %id, completed = meal.completed, "meal completion set");
    Ok(Json(MealResponse::from(meal)))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !repo::delete(&state.db, user_id, id).await? {
        warn!(%user_id, meal_id = %id, "delete of unknown meal");
        return Err(not_found());
    }
    info!(%user_id, meal_id = %id, "meal removed");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /meals/days/:day. `:day` is a weekday name or an ISO date; a
/// `week_start` pins a weekday to one plan week.
#[instrument(skip(state))]
pub async fn get_day(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(day): Path<String>,
    Query(scope): Query<WeekScope>,
) -> Result<Json<DaySummary>, AppError> {
    let day = parse_day(&day)?;
    let week_start = week_start_param(scope.week_start.as_deref())?;
    let meals = match (day, week_start) {
        (MealDay::Date(date), Some(ws)) if !week_dates(ws).contains(&date) => {
            let mut errors = ValidationErrors::default();
            errors.add("week_start", "date is outside the week starting at week_start");
            return Err(errors.into());
        }
        (_, Some(ws)) => repo::list_week(&state.db, user_id, ws).await?,
        (MealDay::Date(date), None) => repo::list_for_date(&state.db, user_id, date).await?,
        (MealDay::Weekday(_), None) => repo::list_templates(&state.db, user_id, day).await?,
    };
    let recommended = recommended_for(&state, user_id).await?;
    Ok(Json(DaySummary::build(
        day_log(day, week_start, meals),
        recommended,
    )))
}

#[instrument(skip(state))]
pub async fn get_week(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(week_start): Path<String>,
) -> Result<Json<WeekSummary>, AppError> {
    let week_start = parse_iso_date(&week_start).ok_or_else(|| {
        let mut errors = ValidationErrors::default();
        errors.add("week_start", "week_start must be a YYYY-MM-DD date");
        AppError::from(errors)
    })?;
    let meals = repo::list_week(&state.db, user_id, week_start).await?;
    let recommended = recommended_for(&state, user_id).await?;
    Ok(Json(week_summary(week_start, meals, recommended)))
}

pub async fn list_time_slots() -> Json<TimeSlots> {
    Json(TimeSlots {
        slots: time_slots(),
    })
}
