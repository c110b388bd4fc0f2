//! The persisted record types: income, expenses and savings goals.
//!
//! Each persisted type has a `New*` counterpart holding validated input that has not yet been
//! assigned an id by the store.

use crate::error::Res;
use crate::model::amount::{parse_non_negative, parse_positive};
use crate::model::Category;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The date format used for every calendar date stored or accepted by this crate.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Anything with an amount and a date: the input shape of the aggregation functions.
pub trait Record {
    fn amount(&self) -> Decimal;
    fn date(&self) -> NaiveDate;
}

/// A single income entry.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IncomeRecord {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    /// Where the money came from, e.g. "Scholarship" or "Part-time job".
    pub source: String,
    pub description: Option<String>,
    pub date: NaiveDate,
}

/// A single expense entry.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExpenseRecord {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub category: Category,
    pub description: Option<String>,
    pub date: NaiveDate,
}

impl ExpenseRecord {
    /// True when this expense is above its category's large-expense threshold.
    pub fn is_over_limit(&self) -> bool {
        self.amount > self.category.threshold()
    }
}

/// A savings goal.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub target_date: NaiveDate,
}

impl Record for IncomeRecord {
    fn amount(&self) -> Decimal {
        self.amount
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Record for ExpenseRecord {
    fn amount(&self) -> Decimal {
        self.amount
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Validated input for a new income record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NewIncome {
    pub amount: Decimal,
    pub source: String,
    pub description: Option<String>,
    pub date: NaiveDate,
}

impl NewIncome {
    /// Validates raw user input. `date` defaults to `today` when absent.
    pub fn parse(
        amount: &str,
        source: &str,
        description: Option<&str>,
        date: Option<&str>,
        today: NaiveDate,
    ) -> Res<Self> {
        Ok(Self {
            amount: parse_positive("amount", amount)?,
            source: required_text("source", source)?,
            description: optional_text(description),
            date: parse_date_or(date, today)?,
        })
    }
}

/// Validated input for a new expense record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NewExpense {
    pub amount: Decimal,
    pub category: Category,
    pub description: Option<String>,
    pub date: NaiveDate,
}

impl NewExpense {
    /// Validates raw user input. `date` defaults to `today` when absent.
    pub fn parse(
        amount: &str,
        category: Category,
        description: Option<&str>,
        date: Option<&str>,
        today: NaiveDate,
    ) -> Res<Self> {
        Ok(Self {
            amount: parse_positive("amount", amount)?,
            category,
            description: optional_text(description),
            date: parse_date_or(date, today)?,
        })
    }
}

/// Validated input for a new goal.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NewGoal {
    pub title: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub target_date: NaiveDate,
}

impl NewGoal {
    /// Validates raw user input. A missing `current_amount` starts the goal at zero.
    pub fn parse(
        title: &str,
        target_amount: &str,
        current_amount: Option<&str>,
        target_date: &str,
    ) -> Res<Self> {
        let current_amount = match current_amount.map(str::trim) {
            Some(s) if !s.is_empty() => parse_non_negative("current amount", s)?,
            _ => Decimal::ZERO,
        };
        Ok(Self {
            title: required_text("title", title)?,
            target_amount: parse_positive("target amount", target_amount)?,
            current_amount,
            target_date: parse_date(target_date)?,
        })
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Res<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))
}

fn parse_date_or(s: Option<&str>, default: NaiveDate) -> Res<NaiveDate> {
    match s.map(str::trim) {
        Some(s) if !s.is_empty() => parse_date(s),
        _ => Ok(default),
    }
}

fn required_text(field: &str, value: &str) -> Res<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("The {field} is required");
    }
    Ok(value.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
