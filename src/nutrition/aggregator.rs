use serde::Serialize;

use crate::meals::model::{Meal, MealDay};

/// Lower and upper bound of the optimal protein band, relative to the target.
pub const OPTIMAL_LOWER: f64 = 0.9;
pub const OPTIMAL_UPPER: f64 = 1.5;

/// Element-wise sum of a meal list. Always derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutritionTotals {
    pub calories: u64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProteinStatus {
    Optimal,
    Low,
    High,
    Unknown,
}

/// Meals that belong to one day of the plan.
#[derive(Debug, Clone)]
pub struct DayLog {
    pub day: MealDay,
    pub meals: Vec<Meal>,
}

impl DayLog {
    pub fn new(day: MealDay, meals: Vec<Meal>) -> Self {
        Self { day, meals }
    }

    pub fn totals(&self) -> NutritionTotals {
        aggregate(&self.meals)
    }

    pub fn completion_rate(&self) -> Option<f64> {
        completion_rate(&self.meals)
    }

    pub fn protein_status(&self, recommended: Option<f64>) -> ProteinStatus {
        protein_status(self.totals().protein, recommended)
    }

    /// Has meals and every one of them is completed.
    pub fn is_completed(&self) -> bool {
        self.completion_rate() == Some(1.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_days: usize,
    pub completed_days: usize,
    pub low_protein_days: usize,
}

pub fn aggregate(meals: &[Meal]) -> NutritionTotals {
    meals.iter().fold(NutritionTotals::default(), |acc, m| NutritionTotals {
        calories: acc.calories + u64::from(m.calories),
        protein: acc.protein + m.protein,
        carbs: acc.carbs + m.carbs,
        fat: acc.fat + m.fat,
    })
}

/// Completed / total, or `None` when there is nothing to complete.
pub fn completion_rate(meals: &[Meal]) -> Option<f64> {
    if meals.is_empty() {
        return None;
    }
    let done = meals.iter().filter(|m| m.completed).count();
    Some(done as f64 / meals.len() as f64)
}

pub fn protein_status(total_protein: f64, recommended: Option<f64>) -> ProteinStatus {
    let Some(target) = recommended.filter(|r| r.is_finite() && *r > 0.0) else {
        return ProteinStatus::Unknown;
    };
    if total_protein < target * OPTIMAL_LOWER {
        ProteinStatus::Low
    } else if total_protein > target * OPTIMAL_UPPER {
        ProteinStatus::High
    } else {
        ProteinStatus::Optimal
    }
}

pub fn statistics(day_logs: &[DayLog], recommended: Option<f64>) -> Statistics {
    Statistics {
        total_days: day_logs.len(),
        completed_days: day_logs.iter().filter(|d| d.is_completed()).count(),
        low_protein_days: day_logs
            .iter()
            .filter(|d| d.protein_status(recommended) == ProteinStatus::Low)
            .count(),
    }
}
