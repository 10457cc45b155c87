use async_trait::async_trait;
use rand::Rng;
use time::OffsetDateTime;
use tracing::info;

use super::{password::verify_secret, repo_types::EmailOtp};

pub const CODE_LENGTH: usize = 6;

/// Delivers verification codes to a mailbox.
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> anyhow::Result<()>;
}

/// Writes the code to the log instead of mailing it. Meant for local setups.
#[derive(Clone, Default)]
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send_code(&self, email: &str, code: &str) -> anyhow::Result<()> {
        info!(%email, %code, "verification code issued");
        Ok(())
    }
}

pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Mismatch,
    Expired,
    TooManyAttempts,
    Missing,
}

impl OtpCheck {
    pub fn message(&self) -> &'static str {
        match self {
            OtpCheck::Valid => "Code accepted",
            OtpCheck::Mismatch => "Invalid code",
            OtpCheck::Expired => "Code expired, request a new one",
            OtpCheck::TooManyAttempts => "Too many attempts, request a new one",
            OtpCheck::Missing => "No active code, request a new one",
        }
    }
}

/// Why the latest code cannot take a guess, if it cannot. The database
/// re-checks expiry and the attempt budget when the guess is reserved.
pub fn rejection(
    otp: Option<&EmailOtp>,
    now: OffsetDateTime,
    max_attempts: i32,
) -> Option<OtpCheck> {
    let Some(otp) = otp else {
        return Some(OtpCheck::Missing);
    };
    if otp.expires_at <= now {
        return Some(OtpCheck::Expired);
    }
    if otp.attempts >= max_attempts {
        return Some(OtpCheck::TooManyAttempts);
    }
    None
}

/// Compares a submitted code against the stored hash.
pub fn code_matches(otp: &EmailOtp, submitted: &str) -> anyhow::Result<OtpCheck> {
    let submitted = submitted.trim();
    if submitted.len() != CODE_LENGTH || !submitted.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(OtpCheck::Mismatch);
    }
    if verify_secret(submitted, &otp.code_hash)? {
        Ok(OtpCheck::Valid)
    } else {
        Ok(OtpCheck::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_secret;
    use time::Duration;
    use uuid::Uuid;

    fn otp(code: &str, expires_in: Duration, attempts: i32) -> EmailOtp {
        let now = OffsetDateTime::now_utc();
        EmailOtp {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code_hash: hash_secret(code).unwrap(),
            expires_at: now + expires_in,
            attempts,
            consumed_at: None,
            created_at: now,
        }
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn accepts_matching_code() {
        let record = otp("123456", Duration::minutes(10), 0);
        let now = OffsetDateTime::now_utc();
        assert_eq!(rejection(Some(&record), now, 5), None);
        assert_eq!(code_matches(&record, " 123456 ").unwrap(), OtpCheck::Valid);
    }

    #[test]
    fn rejects_wrong_or_malformed_code() {
        let record = otp("123456", Duration::minutes(10), 0);
        let now = OffsetDateTime::now_utc();
        assert_eq!(rejection(Some(&record), now, 5), None);
        assert_eq!(code_matches(&record, "654321").unwrap(), OtpCheck::Mismatch);
        assert_eq!(code_matches(&record, "12345a").unwrap(), OtpCheck::Mismatch);
    }

    #[test]
    fn expiry_wins_over_correct_code() {
        let record = otp("123456", Duration::minutes(-1), 0);
        let now = OffsetDateTime::now_utc();
        assert_eq!(rejection(Some(&record), now, 5), Some(OtpCheck::Expired));
    }

    #[test]
    fn attempts_are_capped() {
        let record = otp("123456", Duration::minutes(10), 5);
        let now = OffsetDateTime::now_utc();
        assert_eq!(rejection(Some(&record), now, 5), Some(OtpCheck::TooManyAttempts));
        let record = otp("123456", Duration::minutes(10), 4);
        assert_eq!(rejection(Some(&record), now, 5), None);
    }

    #[test]
    fn missing_record() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(rejection(None, now, 5), Some(OtpCheck::Missing));
    }

    #[tokio::test]
    async fn log_sender_never_fails() {
        LogOtpSender
            .send_code("student@example.com", "000000")
            .await
            .expect("log sender");
    }
}
