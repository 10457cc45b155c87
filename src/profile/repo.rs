use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Profile, ProfileFields};

const PROFILE_COLUMNS: &str = r#"
    user_id, full_name, student_id, institution, department, year_of_study, age, phone,
    sex, goal, activity_level, height_cm, weight_kg, blood_pressure, heart_rate,
    temperature, oxygen_saturation, updated_at
"#;

impl Profile {
    pub async fn find(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("load profile")?;
        Ok(profile)
    }
}

impl ProfileFields {
    /// Writes every field, replacing whatever the row held before.
    pub async fn upsert(&self, db: &PgPool, user_id: Uuid) -> anyhow::Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (
                user_id, full_name, student_id, institution, department, year_of_study, age,
                phone, sex, goal, activity_level, height_cm, weight_kg, blood_pressure,
                heart_rate, temperature, oxygen_saturation
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (user_id) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                student_id = EXCLUDED.student_id,
                institution = EXCLUDED.institution,
                department = EXCLUDED.department,
                year_of_study = EXCLUDED.year_of_study,
                age = EXCLUDED.age,
                phone = EXCLUDED.phone,
                sex = EXCLUDED.sex,
                goal = EXCLUDED.goal,
                activity_level = EXCLUDED.activity_level,
                height_cm = EXCLUDED.height_cm,
                weight_kg = EXCLUDED.weight_kg,
                blood_pressure = EXCLUDED.blood_pressure,
                heart_rate = EXCLUDED.heart_rate,
                temperature = EXCLUDED.temperature,
                oxygen_saturation = EXCLUDED.oxygen_saturation,
                updated_at = now()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&self.full_name)
        .bind(&self.student_id)
        .bind(&self.institution)
        .bind(&self.department)
        .bind(self.year_of_study)
        .bind(self.age)
        .bind(&self.phone)
        .bind(&self.sex)
        .bind(&self.goal)
        .bind(&self.activity_level)
        .bind(self.height_cm)
        .bind(self.weight_kg)
        .bind(&self.blood_pressure)
        .bind(self.heart_rate)
        .bind(self.temperature)
        .bind(self.oxygen_saturation)
        .fetch_one(db)
        .await
        .context("upsert profile")?;
        Ok(profile)
    }
}
