use anyhow::Context;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::{
    model::{format_iso_date, week_dates, Meal, MealDay, MealInput},
    repo_types::{into_meals, MealRow},
};

const MEAL_COLUMNS: &str = r#"
    id, user_id, name, day, week_start, time, calories, protein, carbs, fat,
    ingredients, notes, completed, created_at, updated_at
"#;

/// Optional narrowing of a meal listing.
#[derive(Debug, Default, Clone, Copy)]
pub struct MealFilter {
    pub day: Option<MealDay>,
    pub week_start: Option<Date>,
}

fn db_calories(input: &MealInput) -> anyhow::Result<i32> {
    i32::try_from(input.calories).context("calories out of range")
}

pub async fn insert(db: &PgPool, user_id: Uuid, input: &MealInput) -> anyhow::Result<Meal> {
    let row = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        INSERT INTO meals (id, user_id, name, day, week_start, time, calories, protein,
                           carbs, fat, ingredients, notes, completed)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.name)
    .bind(input.day.to_string())
    .bind(input.week_start)
    .bind(&input.time)
    .bind(db_calories(input)?)
    .bind(input.protein)
    .bind(input.carbs)
    .bind(input.fat)
    .bind(&input.ingredients)
    .bind(&input.notes)
    .bind(input.completed.unwrap_or(false))
    .fetch_one(db)
    .await
    .context("insert meal")?;
    Meal::try_from(row)
}

pub async fn find(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
    let row = sqlx::query_as::<_, MealRow>(&format!(
        "SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND user_id = $2"
    ))
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("load meal")?;
    row.map(Meal::try_from).transpose()
}

pub async fn list(db: &PgPool, user_id: Uuid, filter: MealFilter) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
          FROM meals
         WHERE user_id = $1
           AND ($2::text IS NULL OR day = $2)
           AND ($3::date IS NULL OR week_start = $3)
         ORDER BY week_start NULLS LAST, day, time, created_at
        "#
    ))
    .bind(user_id)
    .bind(filter.day.map(|d| d.to_string()))
    .bind(filter.week_start)
    .fetch_all(db)
    .await
    .context("list meals")?;
    into_meals(rows)
}

/// Meals planned for the week starting at `week_start`, plus meals filed
/// under one of its seven calendar dates.
pub async fn list_week(db: &PgPool, user_id: Uuid, week_start: Date) -> anyhow::Result<Vec<Meal>> {
    let dates: Vec<String> = week_dates(week_start)
        .into_iter()
        .map(format_iso_date)
        .collect();
    let rows = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
          FROM meals
         WHERE user_id = $1
           AND (week_start = $2 OR day = ANY($3))
         ORDER BY time, created_at
        "#
    ))
    .bind(user_id)
    .bind(week_start)
    .bind(&dates)
    .fetch_all(db)
    .await
    .context("list week meals")?;
    into_meals(rows)
}

/// Meals filed under `date`, plus weekday meals whose plan week covers it.
pub async fn list_for_date(
    db: &PgPool,
    user_id: Uuid,
    date: Date,
) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
          FROM meals
         WHERE user_id = $1
           AND (day = $2
                OR (day = $3 AND week_start <= $4::date AND week_start > $4::date - 7))
         ORDER BY time, created_at
        "#
    ))
    .bind(user_id)
    .bind(format_iso_date(date))
    .bind(MealDay::Weekday(date.weekday()).to_string())
    .bind(date)
    .fetch_all(db)
    .await
    .context("list meals for date")?;
    into_meals(rows)
}

/// Weekday meals that belong to no particular week.
pub async fn list_templates(
    db: &PgPool,
    user_id: Uuid,
    day: MealDay,
) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        SELECT {MEAL_COLUMNS}
          FROM meals
         WHERE user_id = $1 AND day = $2 AND week_start IS NULL
         ORDER BY time, created_at
        "#
    ))
    .bind(user_id)
    .bind(day.to_string())
    .fetch_all(db)
    .await
    .context("list template meals")?;
    into_meals(rows)
}

/// Replaces the editable fields. Last write wins.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    meal_id: Uuid,
    input: &MealInput,
) -> anyhow::Result<Option<Meal>> {
    let row = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        UPDATE meals
           SET name = $3, day = $4, week_start = $5, time = $6, calories = $7,
               protein = $8, carbs = $9, fat = $10, ingredients = $11, notes = $12,
               completed = COALESCE($13, completed), updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(meal_id)
    .bind(user_id)
    .bind(&input.name)
    .bind(input.day.to_string())
    .bind(input.week_start)
    .bind(&input.time)
    .bind(db_calories(input)?)
    .bind(input.protein)
    .bind(input.carbs)
    .bind(input.fat)
    .bind(&input.ingredients)
    .bind(&input.notes)
    .bind(input.completed)
    .fetch_optional(db)
    .await
    .context("update meal")?;
    row.map(Meal::try_from).transpose()
}

pub async fn set_completed(
    db: &PgPool,
    user_id: Uuid,
    meal_id: Uuid,
    completed: bool,
) -> anyhow::Result<Option<Meal>> {
    let row = sqlx::query_as::<_, MealRow>(&format!(
        r#"
        UPDATE meals
           SET completed = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(meal_id)
    .bind(user_id)
    .bind(completed)
    .fetch_optional(db)
    .await
    .context("set meal completion")?;
    row.map(Meal::try_from).transpose()
}

/// Returns whether a row was removed.
pub async fn delete(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM meals WHERE id = $1 AND user_id = $2")
        .bind(meal_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete meal")?;
    Ok(res.rows_affected() > 0)
}
