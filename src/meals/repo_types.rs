use anyhow::Context;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::model::{Meal, MealDay};

/// Row of the `meals` table as stored.
#[derive(Debug, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub day: String,
    pub week_start: Option<Date>,
    pub time: String,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub ingredients: Vec<String>,
    pub notes: Option<String>,
    pub completed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<MealRow> for Meal {
    type Error = anyhow::Error;

    fn try_from(r: MealRow) -> Result<Self, Self::Error> {
        let day: MealDay = r
            .day
            .parse()
            .with_context(|| format!("meal {} has a corrupt day key", r.id))?;
        let calories = u32::try_from(r.calories)
            .with_context(|| format!("meal {} has negative calories", r.id))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            day,
            week_start: r.week_start,
            time: r.time,
            calories,
            protein: r.protein,
            carbs: r.carbs,
            fat: r.fat,
            ingredients: r.ingredients,
            notes: r.notes,
            completed: r.completed,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

pub(crate) fn into_meals(rows: Vec<MealRow>) -> anyhow::Result<Vec<Meal>> {
    rows.into_iter().map(Meal::try_from).collect()
}
