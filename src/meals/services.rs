use time::{Date, Duration};

use super::{
    dto::{DaySummary, WeekSummary},
    model::{format_iso_date, week_dates, Meal, MealDay},
};
use crate::nutrition::aggregator::{aggregate, statistics, DayLog};

/// Whether `meal` is eaten on `date`. Dated meals match their date. A
/// weekday-keyed meal matches the same weekday inside its plan week: the
/// week starting at `week_start` when one is given, otherwise its own.
pub fn planned_on(meal: &Meal, date: Date, week_start: Option<Date>) -> bool {
    match meal.day {
        MealDay::Date(d) => d == date,
        MealDay::Weekday(_) if !meal.day.falls_on(date) => false,
        MealDay::Weekday(_) => match (week_start, meal.week_start) {
            (Some(requested), planned) => planned == Some(requested),
            (None, Some(planned)) => planned <= date && date < planned + Duration::days(7),
            (None, None) => false,
        },
    }
}

/// The meals of one day view. A date collects everything eaten on it. A
/// weekday with a `week_start` is the matching date of that week. A bare
/// weekday is the reusable template: weekday meals without a plan week.
pub fn day_log(day: MealDay, week_start: Option<Date>, meals: Vec<Meal>) -> DayLog {
    let date = match (day, week_start) {
        (MealDay::Date(d), _) => Some(d),
        (MealDay::Weekday(_), Some(ws)) => week_dates(ws).into_iter().find(|d| day.falls_on(*d)),
        (MealDay::Weekday(_), None) => None,
    };
    let meals = meals
        .into_iter()
        .filter(|m| match date {
            Some(date) => planned_on(m, date, week_start),
            None => m.day == day && m.week_start.is_none(),
        })
        .collect();
    DayLog::new(day, meals)
}

/// Splits a week's meals into seven dated logs.
pub fn week_logs(week_start: Date, meals: Vec<Meal>) -> Vec<DayLog> {
    week_dates(week_start)
        .into_iter()
        .map(|date| {
            let day_meals = meals
                .iter()
                .filter(|m| planned_on(m, date, Some(week_start)))
                .cloned()
                .collect();
            DayLog::new(MealDay::Date(date), day_meals)
        })
        .collect()
}

pub fn week_summary(week_start: Date, meals: Vec<Meal>, recommended: Option<u32>) -> WeekSummary {
    let logs = week_logs(week_start, meals);
    let all: Vec<Meal> = logs.iter().flat_map(|l| l.meals.iter().cloned()).collect();
    WeekSummary {
        week_start: format_iso_date(week_start),
        recommended_protein_g: recommended,
        totals: aggregate(&all),
        statistics: statistics(&logs, recommended.map(f64::from)),
        days: logs
            .into_iter()
            .map(|log| DaySummary::build(log, recommended))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::model::sample_meal;
    use crate::nutrition::aggregator::ProteinStatus;
    use time::{macros::date, Weekday};

    // 2024-09-02 is a Monday
    const WEEK: Date = date!(2024 - 09 - 02);

    fn planned(day: Weekday, week_start: Option<Date>, protein: f64, completed: bool) -> Meal {
        let mut m = sample_meal("planned", 500, protein, completed);
        m.day = MealDay::Weekday(day);
        m.week_start = week_start;
        m
    }

    fn dated(date: Date, protein: f64, completed: bool) -> Meal {
        let mut m = sample_meal("dated", 400, protein, completed);
        m.day = MealDay::Date(date);
        m
    }

    #[test]
    fn groups_weekday_and_dated_meals() {
        let meals = vec![
            planned(Weekday::Monday, Some(WEEK), 30.0, true),
            planned(Weekday::Wednesday, Some(WEEK), 40.0, false),
            dated(date!(2024 - 09 - 02), 20.0, true),
            dated(date!(2024 - 09 - 08), 10.0, false),
        ];
        let logs = week_logs(WEEK, meals);
        assert_eq!(logs.len(), 7);
        assert_eq!(logs[0].day, MealDay::Date(WEEK));
        assert_eq!(logs[0].meals.len(), 2);
        assert_eq!(logs[2].meals.len(), 1);
        assert_eq!(logs[6].meals.len(), 1);
        assert!(logs[1].meals.is_empty());
    }

    #[test]
    fn other_weeks_plans_are_ignored() {
        let meals = vec![planned(Weekday::Monday, Some(date!(2024 - 08 - 26)), 30.0, true)];
        let logs = week_logs(WEEK, meals);
        assert!(logs.iter().all(|l| l.meals.is_empty()));
    }

    #[test]
    fn week_start_need_not_be_monday() {
        // Thursday start: first log is Thursday
        let start = date!(2024 - 09 - 05);
        let meals = vec![planned(Weekday::Thursday, Some(start), 30.0, true)];
        let logs = week_logs(start, meals);
        assert_eq!(logs[0].meals.len(), 1);
    }

    fn sample_week() -> Vec<Meal> {
        vec![
            planned(Weekday::Monday, Some(WEEK), 100.0, true),
            planned(Weekday::Monday, Some(date!(2024 - 08 - 26)), 100.0, true),
            planned(Weekday::Monday, Some(date!(2024 - 09 - 09)), 100.0, true),
            planned(Weekday::Monday, None, 100.0, false),
            planned(Weekday::Tuesday, Some(WEEK), 50.0, true),
            dated(date!(2024 - 09 - 02), 20.0, false),
            dated(date!(2024 - 09 - 04), 35.0, true),
        ]
    }

    #[test]
    fn day_view_of_a_date_matches_the_week_view() {
        let meals = sample_week();
        let week = week_summary(WEEK, meals.clone(), Some(120));
        for (i, date) in week_dates(WEEK).into_iter().enumerate() {
            let log = day_log(MealDay::Date(date), Some(WEEK), meals.clone());
            let day = serde_json::to_value(DaySummary::build(log, Some(120))).unwrap();
            assert_eq!(day, serde_json::to_value(&week.days[i]).unwrap(), "{date}");

            let log = day_log(MealDay::Date(date), None, meals.clone());
            let day = serde_json::to_value(DaySummary::build(log, Some(120))).unwrap();
            assert_eq!(day, serde_json::to_value(&week.days[i]).unwrap(), "{date}");
        }
    }

    #[test]
    fn dated_day_view_includes_weekday_plans() {
        let log = day_log(MealDay::Date(WEEK), None, sample_week());
        // this week's Monday plan plus the dated meal
        assert_eq!(log.meals.len(), 2);
        assert_eq!(log.totals().protein, 120.0);
    }

    #[test]
    fn weekday_view_does_not_sum_other_weeks() {
        let monday = MealDay::Weekday(Weekday::Monday);

        let log = day_log(monday, Some(WEEK), sample_week());
        assert_eq!(log.totals().protein, 120.0);
        assert_eq!(log.day, monday);

        // bare weekday is the template only
        let log = day_log(monday, None, sample_week());
        assert_eq!(log.meals.len(), 1);
        assert_eq!(log.totals().protein, 100.0);
        assert_eq!(log.protein_status(Some(100.0)), ProteinStatus::Optimal);
    }

    #[test]
    fn summary_rolls_up_the_week() {
        let meals = vec![
            planned(Weekday::Monday, Some(WEEK), 100.0, true),
            planned(Weekday::Tuesday, Some(WEEK), 50.0, true),
            planned(Weekday::Tuesday, Some(WEEK), 10.0, false),
        ];
        let summary = week_summary(WEEK, meals, Some(100));
        assert_eq!(summary.week_start, "2024-09-02");
        assert_eq!(summary.totals.calories, 1500);
        assert_eq!(summary.totals.protein, 160.0);
        assert_eq!(summary.statistics.total_days, 7);
        assert_eq!(summary.statistics.completed_days, 1);
        // Tuesday (60g) plus five empty days are below 90g
        assert_eq!(summary.statistics.low_protein_days, 6);
        assert_eq!(summary.days.len(), 7);
        assert_eq!(summary.days[1].completion_rate, Some(0.5));
    }
}
