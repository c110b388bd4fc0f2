//! Expense command handlers, including the alert pipeline that runs after every insert.

use crate::aggregate::{month_window, total_of};
use crate::alerts::{self, Alert};
use crate::args::{AddExpenseArgs, DeleteArgs};
use crate::commands::alerts::{describe, notify, summarize_outcomes, AlertOutcome};
use crate::commands::{now, Listing, Out};
use crate::db::DateRange;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Amount, ExpenseRecord, NewExpense, NotificationSettings};
use crate::{Config, Mode, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;

/// The result of `expense add`.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseAdded {
    /// The stored expense.
    pub expense: ExpenseRecord,
    /// The alerts the expense triggered.
    pub alerts: Vec<Alert>,
    /// The alerts that passed the notification gate and whether each was delivered.
    pub notifications: Vec<AlertOutcome>,
}

/// An expense as listed, with whether it is above its category's large-expense limit.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRow {
    #[serde(flatten)]
    pub expense: ExpenseRecord,
    pub over_limit: bool,
}

/// Validates and stores a new expense, then evaluates and sends alerts.
///
/// The steps are:
/// 1. Validate the input. Nothing is written when this fails.
/// 2. Insert the expense. A store failure aborts the command.
/// 3. Re-read the current calendar month's expenses. If that fails the budget check is skipped.
/// 4. Evaluate the large-expense and monthly-budget checks.
/// 5. Gate the alerts against the notification settings and email the survivors.
///
/// Steps 3 to 5 never fail the command: the expense is already stored.
pub async fn add_expense(
    config: Config,
    mode: Mode,
    args: AddExpenseArgs,
) -> Result<Out<ExpenseAdded>> {
    add_expense_at(config, mode, args, now()).await
}

pub(crate) async fn add_expense_at(
    config: Config,
    mode: Mode,
    args: AddExpenseArgs,
    now: NaiveDateTime,
) -> Result<Out<ExpenseAdded>> {
    let expense = NewExpense::parse(
        args.amount(),
        args.category(),
        args.description(),
        args.date(),
        now.date(),
    )
    .pub_result(ErrorType::Validation)?;

    let db = config.db();
    let user_id = config.user_id();
    let record = db
        .insert_expense(user_id, &expense, now)
        .await
        .pub_result(ErrorType::Database)?;

    let (from, to) = month_window(now.date());
    let month = match db.select_expenses(user_id, DateRange::between(from, to)).await {
        Ok(month) => Some(month),
        Err(e) => {
            warn!("Unable to re-read this month's expenses, skipping the budget check: {e:#}");
            None
        }
    };
    let settings = match db.load_settings(user_id).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Unable to load notification settings, using the defaults: {e:#}");
            NotificationSettings::default()
        }
    };

    let alerts = alerts::evaluate(&record, month.as_deref(), settings.monthly_budget_limit);
    let notifications = notify(&config, mode, &settings, alerts.clone(), now).await;

    let mut message = format!(
        "Added {} {} expense on {} (id {})",
        Amount::new(record.amount),
        record.category,
        record.date,
        record.id
    );
    for alert in &alerts {
        message.push_str(&format!("\nAlert: {}", describe(alert)));
    }
    if !notifications.is_empty() {
        message.push_str(&format!("\n{}", summarize_outcomes(&notifications)));
    }

    Ok(Out::new(
        message,
        ExpenseAdded {
            expense: record,
            alerts,
            notifications,
        },
    ))
}

/// Lists all expenses, newest first, with the total. Expenses above their category's
/// large-expense limit are flagged.
pub async fn list_expenses(config: Config) -> Result<Out<Listing<ExpenseRow>>> {
    let expenses = config
        .db()
        .select_expenses(config.user_id(), DateRange::all())
        .await
        .pub_result(ErrorType::Database)?;
    let total = total_of(&expenses);

    let mut message = format!(
        "{} expenses, total {}",
        expenses.len(),
        Amount::new(total)
    );
    for expense in &expenses {
        message.push_str(&format!(
            "\n{}  {:>12}  {}{}{}  ({})",
            expense.date,
            Amount::new(expense.amount).to_string(),
            expense.category,
            expense
                .description
                .as_deref()
                .map(|d| format!(": {d}"))
                .unwrap_or_default(),
            if expense.is_over_limit() { "  [over limit]" } else { "" },
            expense.id
        ));
    }

    let items = expenses
        .into_iter()
        .map(|expense| ExpenseRow {
            over_limit: expense.is_over_limit(),
            expense,
        })
        .collect();
    Ok(Out::new(message, Listing { items, total }))
}

/// Deletes one expense.
pub async fn delete_expense(config: Config, args: DeleteArgs) -> Result<Out<()>> {
    config
        .db()
        .delete_expense(config.user_id(), args.id())
        .await
        .pub_result(ErrorType::Database)?;
    Ok(format!("Deleted expense {}", args.id()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;
    use crate::args::SetSettingsArgs;
    use crate::commands::update_settings;
    use crate::model::{Category, RepeatPolicy};
    use crate::test::{noon, TestEnv};

    fn expense(amount: &str, category: Category, date: &str) -> AddExpenseArgs {
        AddExpenseArgs::new(amount, category, None, Some(date.to_string()))
    }

    #[tokio::test]
    async fn test_small_expense_sends_nothing() {
        let env = TestEnv::new().await;
        let out = add_expense_at(
            env.config(),
            Mode::Testing,
            expense("120", Category::Food, "2025-03-05"),
            noon("2025-03-05"),
        )
        .await
        .unwrap();
        let added = out.structure().unwrap();
        assert!(added.alerts.is_empty());
        assert!(added.notifications.is_empty());
        assert!(env.sent().is_empty());
    }

    #[tokio::test]
    async fn test_large_expense_is_emailed() {
        let env = TestEnv::new().await;
        let out = add_expense_at(
            env.config(),
            Mode::Testing,
            AddExpenseArgs::new(
                "450",
                Category::Food,
                Some("Birthday <dinner>".into()),
                Some("2025-03-05".into()),
            ),
            noon("2025-03-05"),
        )
        .await
        .unwrap();
        let added = out.structure().unwrap();
        assert_eq!(added.alerts.len(), 1);
        assert_eq!(added.notifications.len(), 1);
        assert!(added.notifications[0].delivered);

        let sent = env.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("Large Food Expense"), "{}", sent[0].subject);
        assert!(sent[0].html.contains("Birthday &lt;dinner&gt;"));
    }

    #[tokio::test]
    async fn test_budget_alert_repeats_by_default() {
        let env = TestEnv::new().await;
        env.insert_expense("450", Category::Shopping, "2025-03-01").await;
        env.insert_expense("450", Category::Shopping, "2025-03-02").await;

        for day in ["2025-03-05", "2025-03-06"] {
            let out = add_expense_at(
                env.config(),
                Mode::Testing,
                expense("150", Category::Food, day),
                noon(day),
            )
            .await
            .unwrap();
            let kinds: Vec<_> = out
                .structure()
                .unwrap()
                .notifications
                .iter()
                .map(|n| n.kind)
                .collect();
            assert_eq!(kinds, vec![AlertKind::BudgetExceeded]);
        }
        assert_eq!(env.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_budget_alert_once_per_month() {
        let env = TestEnv::new().await;
        update_settings(
            env.config(),
            SetSettingsArgs::default().with_budget_alert_repeat(RepeatPolicy::OncePerMonth),
        )
        .await
        .unwrap();
        env.insert_expense("950", Category::Education, "2025-03-01").await;

        let first = add_expense_at(
            env.config(),
            Mode::Testing,
            expense("100", Category::Food, "2025-03-05"),
            noon("2025-03-05"),
        )
        .await
        .unwrap();
        assert_eq!(first.structure().unwrap().notifications.len(), 1);

        let second = add_expense_at(
            env.config(),
            Mode::Testing,
            expense("100", Category::Food, "2025-03-06"),
            noon("2025-03-06"),
        )
        .await
        .unwrap();
        let second = second.structure().unwrap();
        assert_eq!(second.alerts.len(), 1);
        assert!(second.notifications.is_empty());

        // a new month resets the guard
        let third = add_expense_at(
            env.config(),
            Mode::Testing,
            expense("1100", Category::Education, "2025-04-01"),
            noon("2025-04-01"),
        )
        .await
        .unwrap();
        let kinds: Vec<_> = third
            .structure()
            .unwrap()
            .notifications
            .iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(kinds, vec![AlertKind::LargeExpense, AlertKind::BudgetExceeded]);
    }

    #[tokio::test]
    async fn test_master_switch_off_sends_nothing() {
        let env = TestEnv::new().await;
        update_settings(
            env.config(),
            SetSettingsArgs::default().with_email_notifications(false),
        )
        .await
        .unwrap();
        let out = add_expense_at(
            env.config(),
            Mode::Testing,
            expense("2000", Category::Bills, "2025-03-05"),
            noon("2025-03-05"),
        )
        .await
        .unwrap();
        let added = out.structure().unwrap();
        assert_eq!(added.alerts.len(), 2);
        assert!(added.notifications.is_empty());
        assert!(env.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_expense() {
        let env = TestEnv::failing().await;
        let out = add_expense_at(
            env.config(),
            Mode::Testing,
            expense("2000", Category::Bills, "2025-03-05"),
            noon("2025-03-05"),
        )
        .await
        .unwrap();
        let added = out.structure().unwrap();
        assert_eq!(added.notifications.len(), 2);
        assert!(added.notifications.iter().all(|n| !n.delivered));

        let listed = list_expenses(env.config()).await.unwrap();
        let listed = listed.structure().unwrap();
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].expense.id, added.expense.id);
    }

    #[tokio::test]
    async fn test_invalid_expense_is_not_stored() {
        let env = TestEnv::new().await;
        let err = add_expense_at(
            env.config(),
            Mode::Testing,
            expense("-5", Category::Food, "2025-03-05"),
            noon("2025-03-05"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);

        let err = add_expense_at(
            env.config(),
            Mode::Testing,
            expense("5", Category::Food, "05/03/2025"),
            noon("2025-03-05"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);

        let listed = list_expenses(env.config()).await.unwrap();
        assert!(listed.structure().unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_list_flags_over_limit_and_delete() {
        let env = TestEnv::new().await;
        let big = env.insert_expense("350", Category::Transport, "2025-03-02").await;
        env.insert_expense("50", Category::Transport, "2025-03-01").await;

        let out = list_expenses(env.config()).await.unwrap();
        let listing = out.structure().unwrap();
        assert_eq!(listing.total, rust_decimal::Decimal::from(400));
        assert!(listing.items[0].over_limit);
        assert!(!listing.items[1].over_limit);

        delete_expense(env.config(), DeleteArgs::new(&big.id))
            .await
            .unwrap();
        let out = list_expenses(env.config()).await.unwrap();
        assert_eq!(out.structure().unwrap().items.len(), 1);
    }
}
