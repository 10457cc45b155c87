use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, PendingVerification, PublicUser, RefreshRequest,
            RegisterRequest, ResendOtpRequest, VerifyOtpRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_secret, verify_secret},
        repo_types::User,
        services::{check_password_strength, issue_otp, normalize_email, redeem_otp},
    },
    error::AppError,
    profile::repo_types::ProfileFields,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/resend-otp", post(resend_otp))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PendingVerification>), AppError> {
    let email = normalize_email(&payload.email)?;
    check_password_strength(&payload.password)?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_secret(&payload.password)?;
    let Some(user) = User::create(&state.db, &email, &hash).await? else {
        warn!(email = %email, "email registered concurrently");
        return Err(AppError::Conflict("Email already registered".into()));
    };

    let full_name = payload
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let fields = ProfileFields {
        full_name,
        ..ProfileFields::default()
    };
    fields.upsert(&state.db, user.id).await?;

    issue_otp(&state, &user).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(PendingVerification {
            user: PublicUser::from(&user),
            message: "Verification code sent".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = normalize_email(&payload.email)?;
    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(email = %email, "verification for unknown email");
        return Err(AppError::BadRequest("Invalid code".into()));
    };
    if user.is_verified {
        return Err(AppError::Conflict("Email already verified".into()));
    }

    let user = redeem_otp(&state, &user, &payload.code).await?;

    let tokens = JwtKeys::from_ref(&state).sign_pair(user.id)?;
    Ok(Json(AuthResponse::new(tokens, &user)))
}

#[instrument(skip(state, payload))]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> Result<Json<PendingVerification>, AppError> {
    let email = normalize_email(&payload.email)?;
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("Unknown email".into()))?;
    if user.is_verified {
        return Err(AppError::Conflict("Email already verified".into()));
    }

    issue_otp(&state, &user).await?;
    Ok(Json(PendingVerification {
        user: PublicUser::from(&user),
        message: "Verification code sent".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = normalize_email(&payload.email)?;

    let Some(mut user) = User::find_by_email(&state.db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_secret(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    if !user.is_verified {
        warn!(user_id = %user.id, "login before email verification");
        return Err(AppError::Forbidden("Email not verified".into()));
    }

    if !user.is_admin() && state.config.is_admin_email(&user.email) {
        user = User::promote_to_admin(&state.db, user.id).await?;
        info!(user_id = %user.id, "promoted to admin from ADMIN_EMAILS");
    }

    let tokens = JwtKeys::from_ref(&state).sign_pair(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse::new(tokens, &user)))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let tokens = keys.sign_pair(user.id)?;
    Ok(Json(AuthResponse::new(tokens, &user)))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Json(PublicUser::from(&user)))
}
