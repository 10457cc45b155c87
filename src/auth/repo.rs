use anyhow::Context;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{EmailOtp, User, ROLE_ADMIN};

const USER_COLUMNS: &str = "id, email, password_hash, is_verified, role, created_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Create a new, unverified student with a hashed password. `None` when
    /// the email is already taken.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_optional(db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    pub async fn promote_to_admin(db: &PgPool, id: Uuid) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = '{ROLE_ADMIN}' WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(db)
        .await
        .context("promote user")?;
        Ok(user)
    }

    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list users")?;
        Ok(rows)
    }
}

impl EmailOtp {
    /// Store a fresh code, retiring every code the user still had open.
    pub async fn replace_for_user(
        db: &PgPool,
        user_id: Uuid,
        code_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<EmailOtp> {
        let mut tx = db.begin().await.context("begin tx")?;

        sqlx::query(
            r#"
            UPDATE email_otps
               SET consumed_at = now()
             WHERE user_id = $1 AND consumed_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("retire open codes")?;

        let otp = sqlx::query_as::<_, EmailOtp>(
            r#"
            INSERT INTO email_otps (id, user_id, code_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, code_hash, expires_at, attempts, consumed_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(code_hash)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .context("insert code")?;

        tx.commit().await.context("commit tx")?;
        Ok(otp)
    }

    pub async fn latest_open(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<EmailOtp>> {
        let otp = sqlx::query_as::<_, EmailOtp>(
            r#"
            SELECT id, user_id, code_hash, expires_at, attempts, consumed_at, created_at
              FROM email_otps
             WHERE user_id = $1 AND consumed_at IS NULL
             ORDER BY created_at DESC
             LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("load open code")?;
        Ok(otp)
    }

    /// Takes one guess off the code's budget before it is checked. `None`
    /// when the budget is spent, the code expired or it was already used.
    pub async fn reserve_attempt(
        db: &PgPool,
        id: Uuid,
        max_attempts: i32,
    ) -> anyhow::Result<Option<i32>> {
        let attempts = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE email_otps
               SET attempts = attempts + 1
             WHERE id = $1
               AND consumed_at IS NULL
               AND attempts < $2
               AND expires_at > now()
            RETURNING attempts
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .fetch_optional(db)
        .await
        .context("reserve attempt")?;
        Ok(attempts)
    }

    /// Spend the code and mark its owner verified in one transaction,
    /// optionally granting the admin role. `None` when the code was already
    /// spent by a concurrent request.
    pub async fn consume_and_verify(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
        promote: bool,
    ) -> anyhow::Result<Option<User>> {
        let mut tx = db.begin().await.context("begin tx")?;

        let consumed = sqlx::query(
            "UPDATE email_otps SET consumed_at = now() WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("consume code")?;
        if consumed.rows_affected() != 1 {
            return Ok(None);
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET is_verified = TRUE,
                   role = CASE WHEN $2 THEN '{ROLE_ADMIN}' ELSE role END
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(promote)
        .fetch_one(&mut *tx)
        .await
        .context("mark verified")?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(user))
    }
}
