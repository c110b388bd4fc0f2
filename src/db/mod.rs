//! This module is responsible for reading, writing and managing the SQLite record store.
//!
//! Amounts are stored as decimal text and dates as `YYYY-MM-DD` text so that a lexical
//! comparison of two dates is also a chronological one.

mod migrations;

use crate::alerts::AlertKind;
use crate::error::Res;
use crate::model::{
    parse_date, Amount, Category, ExpenseRecord, Goal, IncomeRecord, NewExpense, NewGoal,
    NewIncome, NotificationSettings, RepeatPolicy, DATE_FORMAT,
};
use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Timestamps are stored in this format so they sort lexically.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A closed date interval used to filter selects. A missing bound is open.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub(crate) struct DateRange {
    pub(crate) from: Option<NaiveDate>,
    pub(crate) to: Option<NaiveDate>,
}

impl DateRange {
    pub(crate) fn all() -> Self {
        Self::default()
    }

    pub(crate) fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    fn bounds(&self) -> (Option<String>, Option<String>) {
        (self.from.map(fmt_date), self.to.map(fmt_date))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that there is a SQLite file at `path`
    /// - Creates a SQLite client
    /// - Updates the database schema with migrations if it is out-of-date
    /// - Returns a constructed `Db` object for further operations
    pub(crate) async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The SQLite database is missing '{}'", path.display());
        }
        let pool = connect(path, false).await?;
        let current: i32 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&pool)
            .await
            .context("Unable to read the schema version")?;
        if current > migrations::CURRENT_VERSION {
            bail!(
                "The database schema version {current} is newer than this program supports ({})",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, current, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    /// - Returns a constructed `Db` object for further operations
    pub(crate) async fn init(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A SQLite database already exists at '{}'", path.display());
        }
        let pool = connect(path, true).await?;
        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create schema_version table")?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .context("Failed to insert initial schema version")?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    pub(crate) async fn insert_income(
        &self,
        user_id: &str,
        income: &NewIncome,
        now: NaiveDateTime,
    ) -> Res<IncomeRecord> {
        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO income (id, user_id, amount, source, description, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(income.amount.to_string())
        .bind(&income.source)
        .bind(&income.description)
        .bind(fmt_date(income.date))
        .bind(fmt_timestamp(now))
        .execute(&self.pool)
        .await
        .context("Unable to insert income")?;
        debug!("Inserted income {id}");
        Ok(IncomeRecord {
            id,
            user_id: user_id.to_string(),
            amount: income.amount,
            source: income.source.clone(),
            description: income.description.clone(),
            date: income.date,
        })
    }

    /// Income for `user_id` within `range`, newest first.
    pub(crate) async fn select_income(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Res<Vec<IncomeRecord>> {
        let (from, to) = range.bounds();
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, source, description, date
            FROM income
            WHERE user_id = ?
              AND (? IS NULL OR date >= ?)
              AND (? IS NULL OR date <= ?)
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(&from)
        .bind(&from)
        .bind(&to)
        .bind(&to)
        .fetch_all(&self.pool)
        .await
        .context("Unable to select income")?;

        rows.iter()
            .map(|row| -> Res<IncomeRecord> {
                Ok(IncomeRecord {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    amount: get_amount(row, "amount")?,
                    source: row.try_get("source")?,
                    description: row.try_get("description")?,
                    date: get_date(row, "date")?,
                })
            })
            .collect()
    }

    pub(crate) async fn delete_income(&self, user_id: &str, id: &str) -> Res<()> {
        self.delete_from("income", user_id, id).await
    }

    pub(crate) async fn insert_expense(
        &self,
        user_id: &str,
        expense: &NewExpense,
        now: NaiveDateTime,
    ) -> Res<ExpenseRecord> {
        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO expenses (id, user_id, amount, category, description, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(expense.amount.to_string())
        .bind(expense.category.to_string())
        .bind(&expense.description)
        .bind(fmt_date(expense.date))
        .bind(fmt_timestamp(now))
        .execute(&self.pool)
        .await
        .context("Unable to insert expense")?;
        debug!("Inserted expense {id}");
        Ok(ExpenseRecord {
            id,
            user_id: user_id.to_string(),
            amount: expense.amount,
            category: expense.category,
            description: expense.description.clone(),
            date: expense.date,
        })
    }

    /// Expenses for `user_id` within `range`, newest first.
    pub(crate) async fn select_expenses(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Res<Vec<ExpenseRecord>> {
        let (from, to) = range.bounds();
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, category, description, date
            FROM expenses
            WHERE user_id = ?
              AND (? IS NULL OR date >= ?)
              AND (? IS NULL OR date <= ?)
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(&from)
        .bind(&from)
        .bind(&to)
        .bind(&to)
        .fetch_all(&self.pool)
        .await
        .context("Unable to select expenses")?;

        rows.iter()
            .map(|row| -> Res<ExpenseRecord> {
                let category: String = row.try_get("category")?;
                Ok(ExpenseRecord {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    amount: get_amount(row, "amount")?,
                    category: Category::parse(&category).unwrap_or_else(|_| {
                        warn!("Unknown stored category '{category}', reading it as Other");
                        Category::Other
                    }),
                    description: row.try_get("description")?,
                    date: get_date(row, "date")?,
                })
            })
            .collect()
    }

    pub(crate) async fn delete_expense(&self, user_id: &str, id: &str) -> Res<()> {
        self.delete_from("expenses", user_id, id).await
    }

    pub(crate) async fn insert_goal(
        &self,
        user_id: &str,
        goal: &NewGoal,
        now: NaiveDateTime,
    ) -> Res<Goal> {
        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO goals (id, user_id, title, target_amount, current_amount, target_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&goal.title)
        .bind(goal.target_amount.to_string())
        .bind(goal.current_amount.to_string())
        .bind(fmt_date(goal.target_date))
        .bind(fmt_timestamp(now))
        .execute(&self.pool)
        .await
        .context("Unable to insert goal")?;
        debug!("Inserted goal {id}");
        Ok(Goal {
            id,
            user_id: user_id.to_string(),
            title: goal.title.clone(),
            target_amount: goal.target_amount,
            current_amount: goal.current_amount,
            target_date: goal.target_date,
        })
    }

    /// All goals for `user_id`, in creation order.
    pub(crate) async fn select_goals(&self, user_id: &str) -> Res<Vec<Goal>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, target_amount, current_amount, target_date
            FROM goals
            WHERE user_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Unable to select goals")?;

        rows.iter().map(goal_from_row).collect()
    }

    /// Sets the saved amount of a goal and returns the updated goal.
    pub(crate) async fn update_goal_progress(
        &self,
        user_id: &str,
        id: &str,
        current_amount: Decimal,
    ) -> Res<Goal> {
        let result = sqlx::query("UPDATE goals SET current_amount = ? WHERE id = ? AND user_id = ?")
            .bind(current_amount.to_string())
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Unable to update goal progress")?;
        if result.rows_affected() == 0 {
            bail!("No goal with id '{id}'");
        }

        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, target_amount, current_amount, target_date
            FROM goals
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .context("Unable to read back the updated goal")?;
        goal_from_row(&row)
    }

    pub(crate) async fn delete_goal(&self, user_id: &str, id: &str) -> Res<()> {
        self.delete_from("goals", user_id, id).await
    }

    /// Loads the notification settings for `user_id`, or the defaults when none are saved.
    pub(crate) async fn load_settings(&self, user_id: &str) -> Res<NotificationSettings> {
        let row = sqlx::query(
            r#"
            SELECT email_notifications, weekly_report, budget_alerts, large_expense_alerts,
                   monthly_budget_limit, budget_alert_repeat
            FROM settings
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Unable to load settings")?;

        let Some(row) = row else {
            return Ok(NotificationSettings::default());
        };
        let repeat: String = row.try_get("budget_alert_repeat")?;
        Ok(NotificationSettings {
            email_notifications: row.try_get("email_notifications")?,
            weekly_report: row.try_get("weekly_report")?,
            budget_alerts: row.try_get("budget_alerts")?,
            large_expense_alerts: row.try_get("large_expense_alerts")?,
            monthly_budget_limit: get_amount(&row, "monthly_budget_limit")?,
            budget_alert_repeat: RepeatPolicy::from_str(&repeat).unwrap_or_else(|_| {
                warn!("Unknown stored budget_alert_repeat '{repeat}', using the default");
                RepeatPolicy::default()
            }),
        })
    }

    pub(crate) async fn save_settings(
        &self,
        user_id: &str,
        settings: &NotificationSettings,
    ) -> Res<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (user_id, email_notifications, weekly_report, budget_alerts,
                                  large_expense_alerts, monthly_budget_limit, budget_alert_repeat)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                email_notifications = excluded.email_notifications,
                weekly_report = excluded.weekly_report,
                budget_alerts = excluded.budget_alerts,
                large_expense_alerts = excluded.large_expense_alerts,
                monthly_budget_limit = excluded.monthly_budget_limit,
                budget_alert_repeat = excluded.budget_alert_repeat
            "#,
        )
        .bind(user_id)
        .bind(settings.email_notifications)
        .bind(settings.weekly_report)
        .bind(settings.budget_alerts)
        .bind(settings.large_expense_alerts)
        .bind(settings.monthly_budget_limit.to_string())
        .bind(settings.budget_alert_repeat.to_string())
        .execute(&self.pool)
        .await
        .context("Unable to save settings")?;
        Ok(())
    }

    /// Records that an alert or report of `kind` was delivered at `sent_at`.
    pub(crate) async fn log_alert(
        &self,
        user_id: &str,
        kind: AlertKind,
        sent_at: NaiveDateTime,
    ) -> Res<()> {
        sqlx::query("INSERT INTO alert_log (user_id, kind, sent_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(kind.to_string())
            .bind(fmt_timestamp(sent_at))
            .execute(&self.pool)
            .await
            .context("Unable to write to the alert log")?;
        Ok(())
    }

    /// The most recent delivery time of an alert of `kind`, if any.
    pub(crate) async fn last_alert(
        &self,
        user_id: &str,
        kind: AlertKind,
    ) -> Res<Option<NaiveDateTime>> {
        let sent_at: Option<String> = sqlx::query_scalar(
            "SELECT MAX(sent_at) FROM alert_log WHERE user_id = ? AND kind = ?",
        )
        .bind(user_id)
        .bind(kind.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Unable to read the alert log")?;

        sent_at
            .map(|s| {
                NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
                    .with_context(|| format!("Invalid timestamp '{s}' in the alert log"))
            })
            .transpose()
    }

    async fn delete_from(&self, table: &str, user_id: &str, id: &str) -> Res<()> {
        let sql = format!("DELETE FROM {table} WHERE id = ? AND user_id = ?");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete from {table}"))?;
        if result.rows_affected() == 0 {
            bail!("No row with id '{id}' in {table}");
        }
        debug!("Deleted {id} from {table}");
        Ok(())
    }
}

async fn connect(path: &Path, create: bool) -> Res<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open SQLite database at '{}'", path.display()))
}

fn goal_from_row(row: &SqliteRow) -> Res<Goal> {
    Ok(Goal {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        target_amount: get_amount(row, "target_amount")?,
        current_amount: get_amount(row, "current_amount")?,
        target_date: get_date(row, "target_date")?,
    })
}

fn get_amount(row: &SqliteRow, column: &str) -> Res<Decimal> {
    let text: String = row.try_get(column)?;
    Ok(Amount::lenient(&text))
}

fn get_date(row: &SqliteRow, column: &str) -> Res<NaiveDate> {
    let text: String = row.try_get(column)?;
    parse_date(&text).with_context(|| format!("Invalid stored date in column '{column}'"))
}

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn fmt_timestamp(t: NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
