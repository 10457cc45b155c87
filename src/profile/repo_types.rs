use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::calculator::{ActivityLevel, Goal, ProteinInput, Sex, MAX_WEIGHT_KG};

/// Editable profile columns. Every field is optional: students fill the
/// form in over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct ProfileFields {
    pub full_name: Option<String>,
    pub student_id: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub year_of_study: Option<i32>,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub sex: Option<String>,
    pub goal: Option<String>,
    pub activity_level: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<i32>,
    pub temperature: Option<f64>,
    pub oxygen_saturation: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: ProfileFields,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ProfileFields {
    /// Calculator input drawn from the stored profile. `None` when weight or
    /// sex is missing, which callers report as "no recommendation".
    pub fn protein_input(&self) -> Option<ProteinInput> {
        let weight_kg = self
            .weight_kg
            .filter(|w| w.is_finite() && *w > 0.0 && *w <= MAX_WEIGHT_KG)?;
        let sex = self.sex.as_deref().and_then(Sex::parse)?;
        Some(ProteinInput {
            weight_kg,
            goal: self.goal.as_deref().map(Goal::parse).unwrap_or(Goal::Unrecognized),
            activity_level: self
                .activity_level
                .as_deref()
                .map(ActivityLevel::parse)
                .unwrap_or(ActivityLevel::Unspecified),
            sex,
        })
    }

    pub fn recommended_protein(&self) -> Option<u32> {
        self.protein_input().map(|input| input.recommended_protein())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_needs_weight_and_sex() {
        let mut fields = ProfileFields::default();
        assert_eq!(fields.recommended_protein(), None);

        fields.weight_kg = Some(70.0);
        assert_eq!(fields.recommended_protein(), None);

        fields.sex = Some("male".into());
        fields.goal = Some("muscle-gain".into());
        fields.activity_level = Some("very-active".into());
        assert_eq!(fields.recommended_protein(), Some(140));
    }

    #[test]
    fn missing_goal_uses_fallback_multiplier() {
        let fields = ProfileFields {
            weight_kg: Some(50.0),
            sex: Some("female".into()),
            ..ProfileFields::default()
        };
        // 50 * (1.6 - 0.1)
        assert_eq!(fields.recommended_protein(), Some(75));
    }

    #[test]
    fn out_of_range_stored_weight_gives_no_target() {
        let fields = ProfileFields {
            weight_kg: Some(5e9),
            sex: Some("male".into()),
            ..ProfileFields::default()
        };
        assert_eq!(fields.recommended_protein(), None);
    }

    #[test]
    fn zero_weight_is_missing_data() {
        let fields = ProfileFields {
            weight_kg: Some(0.0),
            sex: Some("male".into()),
            ..ProfileFields::default()
        };
        assert_eq!(fields.protein_input(), None);
    }
}
