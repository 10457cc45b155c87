use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    auth::{
        otp::{code_matches, generate_code, rejection, OtpCheck},
        password::hash_secret,
        repo_types::{EmailOtp, User},
    },
    error::AppError,
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Lowercases and trims, then rejects anything that doesn't look like an address.
pub(crate) fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    Ok(email)
}

pub(crate) fn check_password_strength(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::BadRequest("Password too short".into()));
    }
    Ok(())
}

/// Generates a code, stores its hash and hands the plain code to the sender.
pub async fn issue_otp(state: &AppState, user: &User) -> anyhow::Result<()> {
    let code = generate_code();
    let hash = hash_secret(&code)?;
    let expires_at = OffsetDateTime::now_utc() + Duration::minutes(state.config.otp.ttl_minutes);

    EmailOtp::replace_for_user(&state.db, user.id, &hash, expires_at).await?;
    state
        .otp
        .send_code(&user.email, &code)
        .await
        .with_context(|| format!("deliver code to {}", user.email))?;

    info!(user_id = %user.id, %expires_at, "verification code sent");
    Ok(())
}

/// Checks a submitted code. The guess is charged against the code's
/// attempt budget before the hash is compared, so parallel requests cannot
/// exceed it. On success the code is spent and the verified user returned,
/// promoted to admin when their address is listed in `ADMIN_EMAILS`.
pub async fn redeem_otp(state: &AppState, user: &User, code: &str) -> Result<User, AppError> {
    let max_attempts = state.config.otp.max_attempts;
    let otp = EmailOtp::latest_open(&state.db, user.id).await?;
    let otp = match (rejection(otp.as_ref(), OffsetDateTime::now_utc(), max_attempts), otp) {
        (None, Some(otp)) => otp,
        (reason, _) => {
            let reason = reason.unwrap_or(OtpCheck::Missing);
            warn!(user_id = %user.id, outcome = ?reason, "verification rejected");
            return Err(AppError::BadRequest(reason.message().into()));
        }
    };

    let Some(attempts) = EmailOtp::reserve_attempt(&state.db, otp.id, max_attempts).await? else {
        warn!(user_id = %user.id, "attempt budget spent");
        return Err(AppError::BadRequest(OtpCheck::TooManyAttempts.message().into()));
    };

    let outcome = code_matches(&otp, code)?;
    if outcome != OtpCheck::Valid {
        warn!(user_id = %user.id, attempts, "wrong verification code");
        return Err(AppError::BadRequest(outcome.message().into()));
    }

    let promote = state.config.is_admin_email(&user.email);
    let Some(verified) = EmailOtp::consume_and_verify(&state.db, otp.id, user.id, promote).await?
    else {
        warn!(user_id = %user.id, "code already spent");
        return Err(AppError::BadRequest(OtpCheck::Missing.message().into()));
    };
    info!(user_id = %user.id, admin = verified.is_admin(), "email verified");
    Ok(verified)
}
