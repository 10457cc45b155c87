use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Age range accepted by the calculator and the profile form.
pub const MIN_AGE: f64 = 14.0;
pub const MAX_AGE: f64 = 80.0;

/// Heaviest body weight the calculator accepts, in kg.
pub const MAX_WEIGHT_KG: f64 = 500.0;

/// Dietary goal driving the base protein multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Goal {
    FatLoss,
    Maintenance,
    MuscleGain,
    /// Anything we don't recognise. Priced like fat-loss.
    #[serde(other)]
    Unrecognized,
}

impl Goal {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fat-loss" => Goal::FatLoss,
            "maintenance" => Goal::Maintenance,
            "muscle-gain" => Goal::MuscleGain,
            _ => Goal::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::FatLoss => "fat-loss",
            Goal::Maintenance => "maintenance",
            Goal::MuscleGain => "muscle-gain",
            Goal::Unrecognized => "unrecognized",
        }
    }
}

/// Exercise intensity category. Only `VeryActive` changes the multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    #[serde(other)]
    Unspecified,
}

impl ActivityLevel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sedentary" => ActivityLevel::Sedentary,
            "lightly-active" => ActivityLevel::LightlyActive,
            "moderately-active" => ActivityLevel::ModeratelyActive,
            "very-active" => ActivityLevel::VeryActive,
            _ => ActivityLevel::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::LightlyActive => "lightly-active",
            ActivityLevel::ModeratelyActive => "moderately-active",
            ActivityLevel::VeryActive => "very-active",
            ActivityLevel::Unspecified => "unspecified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Sex::Male),
            "female" => Some(Sex::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

/// Per-field validation failures. Field name -> human readable message.
#[derive(Debug, Default, Clone, Serialize, Error, PartialEq)]
#[error("{} field(s) failed validation", .fields.len())]
pub struct ValidationErrors {
    pub fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// `Ok(value)` when nothing was recorded, the collected errors otherwise.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Raw calculator input as it arrives from a form. Numbers may come in as
/// JSON numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProteinRequest {
    pub weight: Option<Value>,
    pub goal: Option<String>,
    pub activity_level: Option<String>,
    pub sex: Option<String>,
    pub age: Option<Value>,
    pub height: Option<Value>,
}

/// Input that passed validation; reading a recommendation from it cannot fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProteinInput {
    pub weight_kg: f64,
    pub goal: Goal,
    pub activity_level: ActivityLevel,
    pub sex: Sex,
}

impl ProteinInput {
    pub fn recommended_protein(&self) -> u32 {
        compute_recommended_protein(self.weight_kg, self.goal, self.activity_level, self.sex)
    }

    pub fn multiplier(&self) -> f64 {
        multiplier(self.goal, self.activity_level, self.sex)
    }
}

impl ProteinRequest {
    pub fn validate(&self) -> Result<ProteinInput, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let weight = match numeric(self.weight.as_ref()) {
            Ok(Some(w)) => check_weight(&mut errors, "weight", w),
            Ok(None) => {
                errors.add("weight", "weight is required");
                None
            }
            Err(()) => {
                errors.add("weight", "weight must be a number");
                None
            }
        };

        match numeric(self.age.as_ref()) {
            Ok(Some(age)) => check_age(&mut errors, "age", age),
            Ok(None) => {}
            Err(()) => errors.add("age", "age must be a number"),
        }

        match numeric(self.height.as_ref()) {
            Ok(Some(h)) => {
                check_positive(&mut errors, "height", h);
            }
            Ok(None) => {}
            Err(()) => errors.add("height", "height must be a number"),
        }

        let sex = match self.sex.as_deref().map(Sex::parse) {
            Some(Some(sex)) => Some(sex),
            Some(None) => {
                errors.add("sex", "sex must be one of: male, female");
                None
            }
            None => {
                errors.add("sex", "sex is required");
                None
            }
        };

        let goal = self.goal.as_deref().map(Goal::parse).unwrap_or(Goal::Unrecognized);
        if goal == Goal::Unrecognized {
            warn!(goal = ?self.goal, "unrecognized goal, falling back to fat-loss multiplier");
        }
        let activity_level = self
            .activity_level
            .as_deref()
            .map(ActivityLevel::parse)
            .unwrap_or(ActivityLevel::Unspecified);

        match (weight, sex) {
            (Some(weight_kg), Some(sex)) if errors.is_empty() => Ok(ProteinInput {
                weight_kg,
                goal,
                activity_level,
                sex,
            }),
            _ => Err(errors),
        }
    }
}

/// Accepts JSON numbers and numeric strings; `Err(())` means "present but not a number".
fn numeric(value: Option<&Value>) -> Result<Option<f64>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or(()),
        Some(_) => Err(()),
    }
}

pub(crate) fn check_positive(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: f64,
) -> Option<f64> {
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        errors.add(field, format!("{field} must be greater than 0"));
        None
    }
}

/// Positive and at most [`MAX_WEIGHT_KG`], so the gram target always fits a `u32`.
pub(crate) fn check_weight(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: f64,
) -> Option<f64> {
    let weight = check_positive(errors, field, value)?;
    if weight > MAX_WEIGHT_KG {
        errors.add(field, format!("{field} must be at most {MAX_WEIGHT_KG}"));
        return None;
    }
    Some(weight)
}

pub(crate) fn check_age(errors: &mut ValidationErrors, field: &'static str, age: f64) {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        errors.add(field, format!("{field} must be between {MIN_AGE} and {MAX_AGE}"));
    }
}

// Multipliers are kept in tenths of g/kg so that the female adjustment and the
// final rounding stay exact.
fn multiplier_tenths(goal: Goal, activity_level: ActivityLevel, sex: Sex) -> u32 {
    let very_active = activity_level == ActivityLevel::VeryActive;
    let base = match (goal, very_active) {
        (Goal::Maintenance, false) => 14,
        (Goal::MuscleGain, false) => 18,
        (Goal::FatLoss | Goal::Unrecognized, false) => 16,
        (Goal::Maintenance, true) => 16,
        (Goal::MuscleGain, true) => 20,
        (Goal::FatLoss | Goal::Unrecognized, true) => 18,
    };
    match sex {
        Sex::Male => base,
        Sex::Female => base - 1,
    }
}

/// Protein multiplier in g per kg of body weight.
pub fn multiplier(goal: Goal, activity_level: ActivityLevel, sex: Sex) -> f64 {
    f64::from(multiplier_tenths(goal, activity_level, sex)) / 10.0
}

/// Recommended daily protein in whole grams. `weight_kg` must already be
/// validated against [`MAX_WEIGHT_KG`].
pub fn compute_recommended_protein(
    weight_kg: f64,
    goal: Goal,
    activity_level: ActivityLevel,
    sex: Sex,
) -> u32 {
    let tenths = f64::from(multiplier_tenths(goal, activity_level, sex));
    (weight_kg * tenths / 10.0).round() as u32
}
