use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::ProfileFields;
use crate::nutrition::calculator::{
    check_age, check_positive, check_weight, ActivityLevel, Goal, Sex, ValidationErrors,
    MAX_WEIGHT_KG,
};

/// Body of PUT /profile. Omitted fields are cleared.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileRequest {
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

fn text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ProfileRequest {
    pub fn validate(self) -> Result<ProfileFields, ValidationErrors> {
        lazy_static! {
            static ref BLOOD_PRESSURE_RE: Regex = Regex::new(r"^\d{2,3}/\d{2,3}$").unwrap();
        }
        let mut errors = ValidationErrors::default();

        let sex = text(self.sex);
        if let Some(raw) = sex.as_deref() {
            if Sex::parse(raw).is_none() {
                errors.add("sex", "sex must be one of: male, female");
            }
        }
        let goal = text(self.goal);
        if let Some(raw) = goal.as_deref() {
            if Goal::parse(raw) == Goal::Unrecognized {
                errors.add("goal", "goal must be one of: fat-loss, maintenance, muscle-gain");
            }
        }
        let activity_level = text(self.activity_level);
        if let Some(raw) = activity_level.as_deref() {
            if ActivityLevel::parse(raw) == ActivityLevel::Unspecified {
                errors.add(
                    "activity_level",
                    "activity_level must be one of: sedentary, lightly-active, moderately-active, very-active",
                );
            }
        }

        if let Some(age) = self.age {
            check_age(&mut errors, "age", f64::from(age));
        }
        if let Some(year) = self.year_of_study {
            check_positive(&mut errors, "year_of_study", f64::from(year));
        }
        if let Some(h) = self.height_cm {
            check_positive(&mut errors, "height_cm", h);
        }
        if let Some(w) = self.weight_kg {
            check_weight(&mut errors, "weight_kg", w);
        }
        if let Some(hr) = self.heart_rate {
            check_positive(&mut errors, "heart_rate", f64::from(hr));
        }
        if let Some(t) = self.temperature {
            check_positive(&mut errors, "temperature", t);
        }
        if let Some(spo2) = self.oxygen_saturation {
            if !(spo2 > 0.0 && spo2 <= 100.0) {
                errors.add("oxygen_saturation", "oxygen_saturation must be in (0, 100]");
            }
        }
        let blood_pressure = text(self.blood_pressure);
        if let Some(bp) = blood_pressure.as_deref() {
            if !BLOOD_PRESSURE_RE.is_match(bp) {
                errors.add("blood_pressure", "blood_pressure must look like 120/80");
            }
        }

        errors.finish(ProfileFields {
            full_name: text(self.full_name),
            student_id: text(self.student_id),
            institution: text(self.institution),
            department: text(self.department),
            year_of_study: self.year_of_study,
            age: self.age,
            phone: text(self.phone),
            sex: sex.map(|s| s.to_ascii_lowercase()),
            goal: goal.map(|g| g.to_ascii_lowercase()),
            activity_level: activity_level.map(|a| a.to_ascii_lowercase()),
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            blood_pressure,
            heart_rate: self.heart_rate,
            temperature: self.temperature,
            oxygen_saturation: self.oxygen_saturation,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub email: String,
    pub is_verified: bool,
    #[serde(flatten)]
    pub fields: ProfileFields,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Recommendation drawn from the stored profile. Missing inputs are listed
/// instead of defaulting to a number.
#[derive(Debug, Serialize)]
pub struct ProfileProteinTarget {
    pub recommended_protein_g: Option<u32>,
    pub multiplier: Option<f64>,
    pub missing: Vec<&'static str>,
}

impl ProfileProteinTarget {
    pub fn from_fields(fields: &ProfileFields) -> Self {
        match fields.protein_input() {
            Some(input) => Self {
                recommended_protein_g: Some(input.recommended_protein()),
                multiplier: Some(input.multiplier()),
                missing: Vec::new(),
            },
            None => {
                let mut missing = Vec::new();
                if fields
                    .weight_kg
                    .filter(|w| *w > 0.0 && *w <= MAX_WEIGHT_KG)
                    .is_none()
                {
                    missing.push("weight_kg");
                }
                if fields.sex.as_deref().and_then(Sex::parse).is_none() {
                    missing.push("sex");
                }
                Self {
                    recommended_protein_g: None,
                    multiplier: None,
                    missing,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_request_passes_and_normalizes() {
        let req = ProfileRequest {
            full_name: Some("  Ada Student ".into()),
            sex: Some("Female".into()),
            goal: Some("MUSCLE-GAIN".into()),
            weight_kg: Some(58.0),
            age: Some(19),
            blood_pressure: Some("118/76".into()),
            oxygen_saturation: Some(98.0),
            phone: Some("   ".into()),
            ..ProfileRequest::default()
        };
        let fields = req.validate().expect("valid");
        assert_eq!(fields.full_name.as_deref(), Some("Ada Student"));
        assert_eq!(fields.sex.as_deref(), Some("female"));
        assert_eq!(fields.goal.as_deref(), Some("muscle-gain"));
        assert_eq!(fields.phone, None);
    }

    #[test]
    fn health_metrics_are_range_checked() {
        let req = ProfileRequest {
            age: Some(12),
            height_cm: Some(0.0),
            weight_kg: Some(-3.0),
            heart_rate: Some(0),
            oxygen_saturation: Some(101.0),
            blood_pressure: Some("high".into()),
            goal: Some("bulk".into()),
            ..ProfileRequest::default()
        };
        let errors = req.validate().unwrap_err();
        for field in [
            "age",
            "height_cm",
            "weight_kg",
            "heart_rate",
            "oxygen_saturation",
            "blood_pressure",
            "goal",
        ] {
            assert!(errors.has(field), "expected error for {field}");
        }
    }

    #[test]
    fn weight_is_capped() {
        let req = ProfileRequest {
            weight_kg: Some(501.0),
            ..ProfileRequest::default()
        };
        assert!(req.validate().unwrap_err().has("weight_kg"));

        let req = ProfileRequest {
            weight_kg: Some(500.0),
            ..ProfileRequest::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn target_lists_missing_inputs() {
        let target = ProfileProteinTarget::from_fields(&ProfileFields::default());
        assert_eq!(target.recommended_protein_g, None);
        assert_eq!(target.missing, vec!["weight_kg", "sex"]);

        let fields = ProfileFields {
            weight_kg: Some(60.0),
            sex: Some("female".into()),
            goal: Some("fat-loss".into()),
            activity_level: Some("sedentary".into()),
            ..ProfileFields::default()
        };
        let target = ProfileProteinTarget::from_fields(&fields);
        assert_eq!(target.recommended_protein_g, Some(90));
        assert!(target.missing.is_empty());
    }
}
