//! Pure aggregation functions over in-memory records: sums, group-by, percentages, date
//! windows, transaction merging and goal arithmetic.
//!
//! Nothing in this module touches the record store; callers fetch records first and pass them
//! in.

use crate::model::{Amount, Category, ExpenseRecord, Goal, IncomeRecord, Record, Transaction};
use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Adds up `amounts`, saturating at `Decimal::MAX` / `Decimal::MIN` instead of overflowing.
fn saturating_sum(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    amounts.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Sum of the amounts of `records`. An empty slice sums to zero.
pub fn total_of<R: Record>(records: &[R]) -> Decimal {
    saturating_sum(records.iter().map(Record::amount))
}

/// Sum of amounts given as text. Entries that are not numeric count as zero.
pub fn total_of_text<S: AsRef<str>>(amounts: &[S]) -> Decimal {
    saturating_sum(amounts.iter().map(|s| Amount::lenient(s.as_ref())))
}

/// Sums the amounts of `records` per key. Keys are returned in the order they were first seen.
pub fn group_sum_by<R, K, F>(records: &[R], key_fn: F) -> Vec<(K, Decimal)>
where
    R: Record,
    K: PartialEq,
    F: Fn(&R) -> K,
{
    let mut groups: Vec<(K, Decimal)> = Vec::new();
    for record in records {
        let key = key_fn(record);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, sum)) => *sum = sum.saturating_add(record.amount()),
            None => groups.push((key, record.amount())),
        }
    }
    groups
}

/// `part` as a percentage of `whole`, or zero when `whole` is zero. A share too large to
/// represent saturates.
pub fn percentage_share(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .unwrap_or(if part.is_sign_negative() == whole.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        })
}

/// Spending in one category.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CategorySpend {
    pub category: Category,
    pub amount: Decimal,
}

/// Total spend per category, largest first. Categories with equal totals keep the order in
/// which they first appear in `expenses`.
pub fn category_ranking(expenses: &[ExpenseRecord]) -> Vec<CategorySpend> {
    let mut ranking: Vec<CategorySpend> = group_sum_by(expenses, |e| e.category)
        .into_iter()
        .map(|(category, amount)| CategorySpend { category, amount })
        .collect();
    // sort_by is stable
    ranking.sort_by(|a, b| b.amount.cmp(&a.amount));
    ranking
}

/// Tags incomes and expenses as transactions and orders them newest first. On equal dates
/// incomes come before expenses, and records of the same kind keep their input order.
pub fn merge_transactions(
    incomes: &[IncomeRecord],
    expenses: &[ExpenseRecord],
) -> Vec<Transaction> {
    let mut merged: Vec<Transaction> = incomes
        .iter()
        .map(Transaction::from)
        .chain(expenses.iter().map(Transaction::from))
        .collect();
    merged.sort_by(|a, b| b.date.cmp(&a.date));
    merged
}

/// Records dated within `from ..= to`. With no `to` the window is open ended.
pub fn window_by_date<R: Record + Clone>(
    records: &[R],
    from: NaiveDate,
    to: Option<NaiveDate>,
) -> Vec<R> {
    records
        .iter()
        .filter(|r| r.date() >= from && to.map_or(true, |to| r.date() <= to))
        .cloned()
        .collect()
}

/// The first and last day of the calendar month containing `date`.
pub fn month_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date - Days::new(u64::from(date.day0()));
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    (first, last)
}

/// The trailing window used by the weekly report: seven days before `today` through `today`.
pub fn report_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let from = today.checked_sub_days(Days::new(7)).unwrap_or(NaiveDate::MIN);
    (from, today)
}

/// Percentage of the target saved so far, clamped to `0..=100`.
pub fn goal_progress(goal: &Goal) -> Decimal {
    percentage_share(goal.current_amount, goal.target_amount).clamp(Decimal::ZERO, HUNDRED)
}

/// Whole days from `today` until the goal's target date. Negative once the date has passed.
pub fn days_remaining(goal: &Goal, today: NaiveDate) -> i64 {
    (goal.target_date - today).num_days()
}

/// How much is still missing to reach the target, never less than zero.
pub fn amount_needed(goal: &Goal) -> Decimal {
    goal.target_amount
        .saturating_sub(goal.current_amount)
        .max(Decimal::ZERO)
}

/// A goal together with its computed progress figures.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GoalStatus {
    pub id: String,
    pub title: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub target_date: NaiveDate,
    pub progress: Decimal,
    pub days_remaining: i64,
    pub amount_needed: Decimal,
    pub completed: bool,
}

impl GoalStatus {
    pub fn new(goal: &Goal, today: NaiveDate) -> Self {
        let progress = goal_progress(goal);
        Self {
            id: goal.id.clone(),
            title: goal.title.clone(),
            target_amount: goal.target_amount,
            current_amount: goal.current_amount,
            target_date: goal.target_date,
            progress,
            days_remaining: days_remaining(goal, today),
            amount_needed: amount_needed(goal),
            completed: progress >= HUNDRED,
        }
    }
}

/// Which records the analytics view summarizes.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// Every record.
    #[default]
    All,
    /// The current calendar month.
    Month,
    /// The last seven days, as in the weekly report.
    Week,
}

serde_plain::derive_display_from_serialize!(TimeRange);
serde_plain::derive_fromstr_from_deserialize!(TimeRange);

impl TimeRange {
    /// The closed date window this range covers, or `None` for all time.
    pub fn window(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            TimeRange::All => None,
            TimeRange::Month => Some(month_window(today)),
            TimeRange::Week => Some(report_window(today)),
        }
    }
}

/// An amount and its share of a total.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Share<K> {
    pub key: K,
    pub amount: Decimal,
    pub percentage: Decimal,
}

/// The figures shown by the analytics view.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_savings: Decimal,
    /// Net savings as a percentage of income; zero when there is no income.
    pub savings_rate: Decimal,
    pub income_count: usize,
    pub expense_count: usize,
    /// Largest category first.
    pub by_category: Vec<Share<Category>>,
    /// Sources in first-seen order.
    pub by_source: Vec<Share<String>>,
}

pub fn summarize(incomes: &[IncomeRecord], expenses: &[ExpenseRecord]) -> Summary {
    let total_income = total_of(incomes);
    let total_expenses = total_of(expenses);
    let net_savings = total_income.saturating_sub(total_expenses);

    let by_category = category_ranking(expenses)
        .into_iter()
        .map(|c| Share {
            key: c.category,
            amount: c.amount,
            percentage: percentage_share(c.amount, total_expenses),
        })
        .collect();

    let by_source = group_sum_by(incomes, |i| i.source.clone())
        .into_iter()
        .map(|(key, amount)| Share {
            key,
            amount,
            percentage: percentage_share(amount, total_income),
        })
        .collect();

    Summary {
        total_income,
        total_expenses,
        net_savings,
        savings_rate: percentage_share(net_savings, total_income),
        income_count: incomes.len(),
        expense_count: expenses.len(),
        by_category,
        by_source,
    }
}
