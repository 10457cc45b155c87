use std::{fmt::Display, str::FromStr};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// One-time email verification codes.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    pub ttl_minutes: i64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub otp: OtpConfig,
    /// Lowercased addresses promoted to the admin role once verified.
    pub admin_emails: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutritrack".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "nutritrack-students".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let otp = OtpConfig {
            ttl_minutes: env_or("OTP_TTL_MINUTES", 10),
            max_attempts: env_or("OTP_MAX_ATTEMPTS", 5),
        };
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            jwt,
            otp,
            admin_emails: parse_email_list(&std::env::var("ADMIN_EMAILS").unwrap_or_default()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|a| *a == email)
    }
}

/// Comma separated, case-insensitive, blanks skipped.
fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!(key, error = %e, %default, "invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_and_garbage() {
        assert_eq!(env_or("NUTRITRACK_TEST_UNSET_KEY", 42i64), 42);

        std::env::set_var("NUTRITRACK_TEST_BAD_PORT", "not-a-port");
        assert_eq!(env_or("NUTRITRACK_TEST_BAD_PORT", 8080u16), 8080);

        std::env::set_var("NUTRITRACK_TEST_GOOD_TTL", "15");
        assert_eq!(env_or("NUTRITRACK_TEST_GOOD_TTL", 10i64), 15);
    }

    #[test]
    fn admin_emails_are_normalized() {
        let list = parse_email_list(" Dean@Uni.edu, ,ops@uni.edu ,");
        assert_eq!(list, vec!["dean@uni.edu", "ops@uni.edu"]);
        assert!(parse_email_list("").is_empty());
    }

    #[tokio::test]
    async fn admin_lookup_ignores_case() {
        let mut state = crate::state::AppState::fake();
        let config = std::sync::Arc::make_mut(&mut state.config);
        config.admin_emails = vec!["dean@uni.edu".into()];
        assert!(config.is_admin_email("DEAN@uni.edu "));
        assert!(!config.is_admin_email("student@uni.edu"));
    }
}
