use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::model::{format_iso_date, is_valid_time, parse_iso_date, Meal, MealDay, MealInput};
use crate::nutrition::{
    aggregator::{DayLog, NutritionTotals, Statistics},
    calculator::ValidationErrors,
    dto::ProteinProgress,
};

/// Body of POST /meals and PUT /meals/:id. Numbers left out count as 0.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MealRequest {
    pub name: Option<String>,
    pub day: Option<String>,
    pub week_start: Option<String>,
    pub time: Option<String>,
    pub calories: Option<i64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub ingredients: Option<Vec<String>>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

fn grams(errors: &mut ValidationErrors, field: &'static str, value: Option<f64>) -> f64 {
    match value {
        None => 0.0,
        Some(v) if v.is_finite() && v >= 0.0 => v,
        Some(_) => {
            errors.add(field, format!("{field} must be a number >= 0"));
            0.0
        }
    }
}

impl MealRequest {
    pub fn validate(self) -> Result<MealInput, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            errors.add("name", "name is required");
        }

        let day = match self.day.as_deref().map(str::parse::<MealDay>) {
            Some(Ok(day)) => Some(day),
            Some(Err(e)) => {
                errors.add("day", e.to_string());
                None
            }
            None => {
                errors.add("day", "day is required");
                None
            }
        };

        let week_start = parse_week_start(self.week_start.as_deref(), &mut errors);

        let time = self.time.map(|t| t.trim().to_string()).unwrap_or_default();
        if !is_valid_time(&time) {
            errors.add("time", "time must be HH:MM");
        }

        let calories = match self.calories {
            None => 0,
            Some(c) => u32::try_from(c)
                .ok()
                .filter(|c| i32::try_from(*c).is_ok())
                .unwrap_or_else(|| {
                    errors.add("calories", "calories must be a whole number >= 0");
                    0
                }),
        };
        let protein = grams(&mut errors, "protein", self.protein);
        let carbs = grams(&mut errors, "carbs", self.carbs);
        let fat = grams(&mut errors, "fat", self.fat);

        let ingredients = self
            .ingredients
            .unwrap_or_default()
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        match day {
            Some(day) if errors.is_empty() => Ok(MealInput {
                name,
                day,
                week_start,
                time,
                calories,
                protein,
                carbs,
                fat,
                ingredients,
                notes,
                completed: self.completed,
            }),
            _ => Err(errors),
        }
    }
}

fn parse_week_start(raw: Option<&str>, errors: &mut ValidationErrors) -> Option<Date> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    let parsed = parse_iso_date(raw);
    if parsed.is_none() {
        errors.add("week_start", "week_start must be a YYYY-MM-DD date");
    }
    parsed
}

/// Parses an optional `week_start` query value into a date.
pub fn week_start_param(raw: Option<&str>) -> Result<Option<Date>, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let parsed = parse_week_start(raw, &mut errors);
    errors.finish(parsed)
}

#[derive(Debug, Default, Deserialize)]
pub struct MealListQuery {
    pub day: Option<String>,
    pub week_start: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeekScope {
    pub week_start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct MealResponse {
    pub id: Uuid,
    pub name: String,
    pub day: String,
    pub week_start: Option<String>,
    pub time: String,
    pub calories: u32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub ingredients: Vec<String>,
    pub notes: Option<String>,
    pub completed: bool,
}

impl From<Meal> for MealResponse {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            name: m.name,
            day: m.day.to_string(),
            week_start: m.week_start.map(format_iso_date),
            time: m.time,
            calories: m.calories,
            protein: m.protein,
            carbs: m.carbs,
            fat: m.fat,
            ingredients: m.ingredients,
            notes: m.notes,
            completed: m.completed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DaySummary {
    pub day: String,
    pub meals: Vec<MealResponse>,
    pub totals: NutritionTotals,
    /// `null` when the day has no meals.
    pub completion_rate: Option<f64>,
    pub protein: ProteinProgress,
}

impl DaySummary {
    pub fn build(log: DayLog, recommended: Option<u32>) -> Self {
        let target = recommended.map(f64::from);
        let totals = log.totals();
        Self {
            day: log.day.to_string(),
            completion_rate: log.completion_rate(),
            protein: ProteinProgress {
                recommended,
                consumed: totals.protein,
                status: log.protein_status(target),
            },
            totals,
            meals: log.meals.into_iter().map(MealResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WeekSummary {
    pub week_start: String,
    pub recommended_protein_g: Option<u32>,
    pub totals: NutritionTotals,
    pub statistics: Statistics,
    pub days: Vec<DaySummary>,
}

#[derive(Debug, Serialize)]
pub struct TimeSlots {
    pub slots: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::aggregator::ProteinStatus;
    use time::{macros::date, Weekday};

    fn request() -> MealRequest {
        MealRequest {
            name: Some(" Chicken bowl ".into()),
            day: Some("wednesday".into()),
            week_start: Some("2024-09-02".into()),
            time: Some("12:30".into()),
            calories: Some(640),
            protein: Some(48.0),
            carbs: Some(60.0),
            fat: None,
            ingredients: Some(vec!["rice".into(), " ".into(), "chicken".into()]),
            notes: Some("".into()),
            completed: None,
        }
    }

    #[test]
    fn valid_request_becomes_input() {
        let input = request().validate().expect("valid meal");
        assert_eq!(input.name, "Chicken bowl");
        assert_eq!(input.day, MealDay::Weekday(Weekday::Wednesday));
        assert_eq!(input.week_start, Some(date!(2024 - 09 - 02)));
        assert_eq!(input.fat, 0.0);
        assert_eq!(input.ingredients, vec!["rice", "chicken"]);
        assert_eq!(input.notes, None);
        assert_eq!(input.completed, None);
    }

    #[test]
    fn off_slot_times_are_accepted() {
        let mut req = request();
        req.time = Some("13:17".into());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn collects_field_errors() {
        let req = MealRequest {
            name: Some("  ".into()),
            day: Some("someday".into()),
            week_start: Some("next week".into()),
            time: Some("noon".into()),
            calories: Some(-10),
            protein: Some(-1.0),
            carbs: Some(f64::NAN),
            ..MealRequest::default()
        };
        let errors = req.validate().unwrap_err();
        for field in ["name", "day", "week_start", "time", "calories", "protein", "carbs"] {
            assert!(errors.has(field), "expected error for {field}");
        }
        assert!(!errors.has("fat"));
    }

    #[test]
    fn missing_day_is_reported() {
        let mut req = request();
        req.day = None;
        assert!(req.validate().unwrap_err().has("day"));
    }

    #[test]
    fn week_start_param_parsing() {
        assert_eq!(week_start_param(None).unwrap(), None);
        assert_eq!(week_start_param(Some("")).unwrap(), None);
        assert_eq!(
            week_start_param(Some("2024-09-02")).unwrap(),
            Some(date!(2024 - 09 - 02))
        );
        assert!(week_start_param(Some("02.09.2024")).is_err());
    }

    #[test]
    fn day_summary_reports_missing_target_as_unknown() {
        let meal = crate::meals::model::sample_meal("Eggs", 300, 25.0, true);
        let log = DayLog::new(MealDay::Weekday(Weekday::Monday), vec![meal]);
        let summary = DaySummary::build(log, None);
        assert_eq!(summary.protein.status, ProteinStatus::Unknown);
        assert_eq!(summary.protein.recommended, None);
        assert_eq!(summary.completion_rate, Some(1.0));
        assert_eq!(summary.totals.calories, 300);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["protein"]["status"], "unknown");
        assert!(json["protein"]["recommended"].is_null());
        assert_eq!(json["day"], "Monday");
    }

    #[test]
    fn empty_day_summary_has_no_completion_rate() {
        let log = DayLog::new(MealDay::Date(date!(2024 - 09 - 03)), vec![]);
        let summary = DaySummary::build(log, Some(120));
        assert_eq!(summary.completion_rate, None);
        assert_eq!(summary.protein.status, ProteinStatus::Low);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["completion_rate"].is_null());
        assert_eq!(json["day"], "2024-09-03");
    }
}
