//! Alert evaluation and the notification gate.
//!
//! Evaluation is a pure decision over a newly inserted expense and the month's expenses. It
//! knows nothing about user preferences. The gate is the second stage: it filters evaluated
//! alerts by the user's `NotificationSettings` and the alert log.

use crate::aggregate::{category_ranking, month_window, total_of, CategorySpend};
use crate::model::{Category, ExpenseRecord, NotificationSettings, RepeatPolicy};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How many categories a budget alert lists.
const TOP_CATEGORIES: usize = 3;

/// The kinds of email this crate sends. Also used as the `kind` column of the alert log.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LargeExpense,
    BudgetExceeded,
    WeeklyReport,
}

serde_plain::derive_display_from_serialize!(AlertKind);
serde_plain::derive_fromstr_from_deserialize!(AlertKind);

/// A single expense above its category threshold.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LargeExpenseAlert {
    pub amount: Decimal,
    pub category: Category,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub threshold: Decimal,
    pub overspent: Decimal,
}

/// Month-to-date spending above the user's limit.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BudgetExceededAlert {
    pub total_monthly: Decimal,
    pub limit: Decimal,
    pub overspent_amount: Decimal,
    /// At most three categories, largest first.
    pub top_categories: Vec<CategorySpend>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    LargeExpense(LargeExpenseAlert),
    BudgetExceeded(BudgetExceededAlert),
}

impl Alert {
    pub fn kind(&self) -> AlertKind {
        match self {
            Alert::LargeExpense(_) => AlertKind::LargeExpense,
            Alert::BudgetExceeded(_) => AlertKind::BudgetExceeded,
        }
    }
}

/// Returns an alert when `expense` is strictly above its category's threshold.
pub fn check_large_expense(expense: &ExpenseRecord) -> Option<LargeExpenseAlert> {
    let threshold = expense.category.threshold();
    if expense.amount <= threshold {
        return None;
    }
    Some(LargeExpenseAlert {
        amount: expense.amount,
        category: expense.category,
        description: expense.description.clone(),
        date: expense.date,
        threshold,
        overspent: expense.amount.saturating_sub(threshold),
    })
}

/// Returns an alert when the sum of `month_expenses` is strictly above `limit`.
pub fn check_monthly_budget(
    month_expenses: &[ExpenseRecord],
    limit: Decimal,
) -> Option<BudgetExceededAlert> {
    let total_monthly = total_of(month_expenses);
    if total_monthly <= limit {
        return None;
    }
    let mut top_categories = category_ranking(month_expenses);
    top_categories.truncate(TOP_CATEGORIES);
    Some(BudgetExceededAlert {
        total_monthly,
        limit,
        overspent_amount: total_monthly.saturating_sub(limit),
        top_categories,
    })
}

/// Evaluates a newly inserted expense. `month_expenses` is `None` when the month could not be
/// read, in which case only the large-expense check runs.
pub fn evaluate(
    inserted: &ExpenseRecord,
    month_expenses: Option<&[ExpenseRecord]>,
    limit: Decimal,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if let Some(alert) = check_large_expense(inserted) {
        alerts.push(Alert::LargeExpense(alert));
    }
    if let Some(alert) = month_expenses.and_then(|month| check_monthly_budget(month, limit)) {
        alerts.push(Alert::BudgetExceeded(alert));
    }
    alerts
}

/// Checks a whole month at once: one large-expense check per expense, in the order given,
/// followed by the budget check.
pub fn scan_month(month_expenses: &[ExpenseRecord], limit: Decimal) -> Vec<Alert> {
    month_expenses
        .iter()
        .filter_map(check_large_expense)
        .map(Alert::LargeExpense)
        .chain(check_monthly_budget(month_expenses, limit).map(Alert::BudgetExceeded))
        .collect()
}

/// Whether `settings` permit sending an email of `kind` at all.
pub fn allows(settings: &NotificationSettings, kind: AlertKind) -> bool {
    settings.email_notifications
        && match kind {
            AlertKind::LargeExpense => settings.large_expense_alerts,
            AlertKind::BudgetExceeded => settings.budget_alerts,
            AlertKind::WeeklyReport => settings.weekly_report,
        }
}

/// Keeps the alerts the user wants to receive.
///
/// `last_budget_alert` is the most recent delivery of a budget alert from the alert log. It is
/// only consulted under `RepeatPolicy::OncePerMonth`, which drops a budget alert when one was
/// already delivered in the calendar month of `now`.
pub fn gate(
    alerts: Vec<Alert>,
    settings: &NotificationSettings,
    last_budget_alert: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Vec<Alert> {
    let (month_start, month_end) = month_window(now.date());
    let budget_sent_this_month = last_budget_alert
        .map(|t| t.date() >= month_start && t.date() <= month_end)
        .unwrap_or(false);

    alerts
        .into_iter()
        .filter(|alert| {
            let kind = alert.kind();
            if !allows(settings, kind) {
                debug!("Suppressing {kind} alert, disabled in settings");
                return false;
            }
            if kind == AlertKind::BudgetExceeded
                && settings.budget_alert_repeat == RepeatPolicy::OncePerMonth
                && budget_sent_this_month
            {
                debug!("Suppressing budget alert, one was already sent this month");
                return false;
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_date;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn expense(amount: &str, category: Category) -> ExpenseRecord {
        ExpenseRecord {
            id: format!("e-{amount}"),
            user_id: "u1".into(),
            amount: dec(amount),
            category,
            description: Some("Test".into()),
            date: parse_date("2025-03-10").unwrap(),
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn budget_alert() -> Alert {
        let month = vec![expense("1200", Category::Education)];
        check_monthly_budget(&month, dec("1000"))
            .map(Alert::BudgetExceeded)
            .unwrap()
    }

    #[test]
    fn test_large_expense_strictly_above_threshold() {
        assert!(check_large_expense(&expense("300", Category::Food)).is_none());
        let alert = check_large_expense(&expense("301", Category::Food)).unwrap();
        assert_eq!(alert.threshold, dec("300"));
        assert_eq!(alert.overspent, dec("1"));
        assert_eq!(alert.description.as_deref(), Some("Test"));
    }

    #[test]
    fn test_other_category_uses_default_threshold() {
        assert!(check_large_expense(&expense("500", Category::Other)).is_none());
        assert!(check_large_expense(&expense("500.01", Category::Other)).is_some());
    }

    #[test]
    fn test_budget_at_limit_does_not_fire() {
        let month = vec![
            expense("600", Category::Education),
            expense("400", Category::Bills),
        ];
        assert!(check_monthly_budget(&month, dec("1000")).is_none());
    }

    #[test]
    fn test_budget_one_paisa_over_fires() {
        let month = vec![
            expense("600", Category::Education),
            expense("400.01", Category::Bills),
        ];
        let alert = check_monthly_budget(&month, dec("1000")).unwrap();
        assert_eq!(alert.total_monthly, dec("1000.01"));
        assert_eq!(alert.overspent_amount, dec("0.01"));
        assert_eq!(alert.limit, dec("1000"));
    }

    #[test]
    fn test_budget_top_three_categories() {
        let month = vec![
            expense("100", Category::Food),
            expense("500", Category::Bills),
            expense("200", Category::Transport),
            expense("50", Category::Shopping),
            expense("300", Category::Food),
        ];
        let alert = check_monthly_budget(&month, dec("1000")).unwrap();
        assert_eq!(alert.total_monthly, dec("1150"));
        assert_eq!(alert.overspent_amount, dec("150"));
        let top: Vec<Category> = alert.top_categories.iter().map(|c| c.category).collect();
        assert_eq!(
            top,
            vec![Category::Bills, Category::Food, Category::Transport]
        );
    }

    #[test]
    fn test_evaluate_both_alerts_independently() {
        let inserted = expense("301", Category::Food);
        let month = vec![inserted.clone(), expense("800", Category::Bills)];
        let alerts = evaluate(&inserted, Some(&month), dec("1000"));
        let kinds: Vec<AlertKind> = alerts.iter().map(Alert::kind).collect();
        assert_eq!(kinds, vec![AlertKind::LargeExpense, AlertKind::BudgetExceeded]);
    }

    #[test]
    fn test_evaluate_without_month_skips_budget() {
        let inserted = expense("5000", Category::Education);
        let alerts = evaluate(&inserted, None, dec("1000"));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind(), AlertKind::LargeExpense);
    }

    #[test]
    fn test_scan_month() {
        let month = vec![
            expense("250", Category::Transport),
            expense("100", Category::Food),
            expense("900", Category::Bills),
        ];
        let kinds: Vec<AlertKind> = scan_month(&month, dec("1000"))
            .iter()
            .map(Alert::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::LargeExpense,
                AlertKind::LargeExpense,
                AlertKind::BudgetExceeded
            ]
        );
    }

    #[test]
    fn test_gate_respects_toggles() {
        let large = Alert::LargeExpense(check_large_expense(&expense("301", Category::Food)).unwrap());
        let alerts = vec![large, budget_alert()];
        let now = at("2025-03-10 12:00:00");

        let all_on = NotificationSettings::default();
        assert_eq!(gate(alerts.clone(), &all_on, None, now).len(), 2);

        let no_budget = NotificationSettings {
            budget_alerts: false,
            ..Default::default()
        };
        let kept = gate(alerts.clone(), &no_budget, None, now);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].kind(), AlertKind::LargeExpense);

        let master_off = NotificationSettings {
            email_notifications: false,
            ..Default::default()
        };
        assert!(gate(alerts, &master_off, None, now).is_empty());
    }

    #[test]
    fn test_gate_once_per_month() {
        let now = at("2025-03-10 12:00:00");
        let settings = NotificationSettings {
            budget_alert_repeat: RepeatPolicy::OncePerMonth,
            ..Default::default()
        };
        let same_month = Some(at("2025-03-01 08:00:00"));
        let last_month = Some(at("2025-02-28 23:59:59"));

        assert!(gate(vec![budget_alert()], &settings, same_month, now).is_empty());
        assert_eq!(gate(vec![budget_alert()], &settings, last_month, now).len(), 1);
        assert_eq!(gate(vec![budget_alert()], &settings, None, now).len(), 1);

        let always = NotificationSettings::default();
        assert_eq!(gate(vec![budget_alert()], &always, same_month, now).len(), 1);
    }

    #[test]
    fn test_allows_weekly_report() {
        let mut settings = NotificationSettings::default();
        assert!(allows(&settings, AlertKind::WeeklyReport));
        settings.weekly_report = false;
        assert!(!allows(&settings, AlertKind::WeeklyReport));
    }

    #[test]
    fn test_alert_kind_strings() {
        assert_eq!(AlertKind::BudgetExceeded.to_string(), "budget_exceeded");
        assert_eq!(
            AlertKind::from_str("weekly_report").unwrap(),
            AlertKind::WeeklyReport
        );
    }
}
