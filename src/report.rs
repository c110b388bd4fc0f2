//! The weekly financial report.

use crate::aggregate::{
    category_ranking, percentage_share, report_window, total_of, window_by_date, CategorySpend,
    GoalStatus,
};
use crate::model::{ExpenseRecord, Goal, IncomeRecord};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The structured payload of the weekly report. It carries no markup; see
/// `email::weekly_report_email` for the rendered form.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    /// Income minus expenses. May be negative.
    pub savings: Decimal,
    /// Savings as a percentage of income, zero when there was no income.
    pub savings_rate: Decimal,
    /// Every category with spending in the window, largest first.
    pub top_categories: Vec<CategorySpend>,
    /// All goals regardless of date.
    pub goals: Vec<GoalStatus>,
}

/// Builds the report for the seven days ending `today`. Records outside the window are
/// ignored, goals are always included.
pub fn compose_weekly(
    incomes: &[IncomeRecord],
    expenses: &[ExpenseRecord],
    goals: &[Goal],
    today: NaiveDate,
) -> WeeklyReport {
    let (window_start, window_end) = report_window(today);
    let incomes = window_by_date(incomes, window_start, Some(window_end));
    let expenses = window_by_date(expenses, window_start, Some(window_end));

    let total_income = total_of(&incomes);
    let total_expenses = total_of(&expenses);
    let savings = total_income.saturating_sub(total_expenses);

    WeeklyReport {
        window_start,
        window_end,
        total_income,
        total_expenses,
        savings,
        savings_rate: percentage_share(savings, total_income),
        top_categories: category_ranking(&expenses),
        goals: goals.iter().map(|g| GoalStatus::new(g, today)).collect(),
    }
}

/// The automatic weekly report goes out on Mondays, at most once per day.
pub fn is_due(today: NaiveDate, last_sent: Option<NaiveDateTime>) -> bool {
    today.weekday() == Weekday::Mon && last_sent.map(|t| t.date() != today).unwrap_or(true)
}
