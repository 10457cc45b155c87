use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use time::{macros::format_description, Date, Duration, OffsetDateTime, Weekday};
use uuid::Uuid;

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("Monday", Weekday::Monday),
    ("Tuesday", Weekday::Tuesday),
    ("Wednesday", Weekday::Wednesday),
    ("Thursday", Weekday::Thursday),
    ("Friday", Weekday::Friday),
    ("Saturday", Weekday::Saturday),
    ("Sunday", Weekday::Sunday),
];

/// First and last time-of-day slot offered by the planner, in minutes after midnight.
const FIRST_SLOT_MINUTES: u32 = 6 * 60;
const LAST_SLOT_MINUTES: u32 = 22 * 60;
const SLOT_STEP_MINUTES: usize = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("day must be an English weekday name or a YYYY-MM-DD date, got {0:?}")]
pub struct InvalidMealDay(pub String);

/// Grouping key of a meal: either a weekday of a weekly plan or a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealDay {
    Weekday(Weekday),
    Date(Date),
}

impl MealDay {
    /// Whether a meal filed under this key belongs on `date`.
    pub fn falls_on(&self, date: Date) -> bool {
        match self {
            MealDay::Weekday(w) => date.weekday() == *w,
            MealDay::Date(d) => *d == date,
        }
    }
}

impl FromStr for MealDay {
    type Err = InvalidMealDay;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Some((_, weekday)) = WEEKDAYS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        {
            return Ok(MealDay::Weekday(*weekday));
        }
        parse_iso_date(trimmed)
            .map(MealDay::Date)
            .ok_or_else(|| InvalidMealDay(raw.to_string()))
    }
}

impl fmt::Display for MealDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MealDay::Weekday(w) => {
                let name = WEEKDAYS
                    .iter()
                    .find(|(_, day)| day == w)
                    .map(|(name, _)| *name)
                    .unwrap_or("Monday");
                f.write_str(name)
            }
            MealDay::Date(d) => f.write_str(&format_iso_date(*d)),
        }
    }
}

pub fn parse_iso_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// The seven consecutive dates of a plan starting at `week_start`.
pub fn week_dates(week_start: Date) -> Vec<Date> {
    (0..7).map(|offset| week_start + Duration::days(offset)).collect()
}

pub fn is_valid_time(raw: &str) -> bool {
    lazy_static! {
        static ref TIME_RE: Regex = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();
    }
    TIME_RE.is_match(raw)
}

/// Half-hour slots offered by the planner UI, 06:00 through 22:00 inclusive.
pub fn time_slots() -> Vec<String> {
    (FIRST_SLOT_MINUTES..=LAST_SLOT_MINUTES)
        .step_by(SLOT_STEP_MINUTES)
        .map(|m| format!("{:02}:{:02}", m / 60, m % 60))
        .collect()
}

/// A recorded or planned eating event owned by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub day: MealDay,
    pub week_start: Option<Date>,
    pub time: String,
    pub calories: u32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub ingredients: Vec<String>,
    pub notes: Option<String>,
    pub completed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated, user-editable part of a meal.
#[derive(Debug, Clone, PartialEq)]
pub struct MealInput {
    pub name: String,
    pub day: MealDay,
    pub week_start: Option<Date>,
    pub time: String,
    pub calories: u32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub ingredients: Vec<String>,
    pub notes: Option<String>,
    /// `None` keeps the stored flag on edit; new meals start planned.
    pub completed: Option<bool>,
}

#[cfg(test)]
pub(crate) fn sample_meal(name: &str, calories: u32, protein: f64, completed: bool) -> Meal {
    let now = OffsetDateTime::now_utc();
    Meal {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        name: name.to_string(),
        day: MealDay::Weekday(Weekday::Monday),
        week_start: None,
        time: "08:00".into(),
        calories,
        protein,
        carbs: 0.0,
        fat: 0.0,
        ingredients: Vec::new(),
        notes: None,
        completed,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_weekdays_case_insensitively() {
        assert_eq!("monday".parse::<MealDay>(), Ok(MealDay::Weekday(Weekday::Monday)));
        assert_eq!(" SUNDAY ".parse::<MealDay>(), Ok(MealDay::Weekday(Weekday::Sunday)));
        assert_eq!(MealDay::Weekday(Weekday::Friday).to_string(), "Friday");
    }

    #[test]
    fn parses_iso_dates() {
        let day: MealDay = "2024-03-05".parse().unwrap();
        assert_eq!(day, MealDay::Date(date!(2024 - 03 - 05)));
        assert_eq!(day.to_string(), "2024-03-05");
    }

    #[test]
    fn rejects_other_day_keys() {
        assert!("someday".parse::<MealDay>().is_err());
        assert!("2024-13-01".parse::<MealDay>().is_err());
        assert!("05/03/2024".parse::<MealDay>().is_err());
    }

    #[test]
    fn weekday_key_falls_on_matching_dates() {
        // 2024-03-04 is a Monday
        let monday = MealDay::Weekday(Weekday::Monday);
        assert!(monday.falls_on(date!(2024 - 03 - 04)));
        assert!(monday.falls_on(date!(2024 - 03 - 11)));
        assert!(!monday.falls_on(date!(2024 - 03 - 05)));
        assert!(MealDay::Date(date!(2024 - 03 - 05)).falls_on(date!(2024 - 03 - 05)));
    }

    #[test]
    fn week_spans_seven_days() {
        let dates = week_dates(date!(2024 - 12 - 30));
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[6], date!(2025 - 01 - 05));
    }

    #[test]
    fn time_validation() {
        assert!(is_valid_time("06:30"));
        assert!(is_valid_time("23:59"));
        assert!(is_valid_time("07:15"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("7:30"));
        assert!(!is_valid_time("breakfast"));
    }

    #[test]
    fn slots_cover_six_to_ten_in_half_hours() {
        let slots = time_slots();
        assert_eq!(slots.len(), 33);
        assert_eq!(slots.first().map(String::as_str), Some("06:00"));
        assert_eq!(slots[1], "06:30");
        assert_eq!(slots.last().map(String::as_str), Some("22:00"));
    }
}
