//! The weekly report command.

use crate::alerts::{allows, AlertKind};
use crate::args::WeeklyReportArgs;
use crate::commands::{now, Out};
use crate::db::DateRange;
use crate::email::weekly_report_email;
use crate::error::{ErrorType, IntoResult};
use crate::model::Amount;
use crate::notify::{deliver, dispatcher};
use crate::report::{compose_weekly, is_due, WeeklyReport};
use crate::{Config, Mode, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

/// The report and, when sending was requested, what happened to the email.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyOutcome {
    pub report: WeeklyReport,
    /// `None` when no send was attempted.
    pub delivered: Option<bool>,
    /// Why the report was not sent, when a send was requested but skipped.
    pub skipped: Option<String>,
}

/// Composes the report for the seven days ending today and optionally emails it.
///
/// With `send`, the report is emailed if weekly reports are enabled in the notification
/// settings. With `if_due`, it is additionally only sent on a Monday on which no weekly report
/// has been sent yet.
///
/// # Errors
/// - Returns a database error if records or settings cannot be read.
pub async fn weekly_report(
    config: Config,
    mode: Mode,
    args: WeeklyReportArgs,
) -> Result<Out<WeeklyOutcome>> {
    weekly_report_at(config, mode, args, now()).await
}

pub(crate) async fn weekly_report_at(
    config: Config,
    mode: Mode,
    args: WeeklyReportArgs,
    now: NaiveDateTime,
) -> Result<Out<WeeklyOutcome>> {
    let today = now.date();
    let db = config.db();
    let user_id = config.user_id();

    // compose_weekly filters by its own window; the goal snapshot is never date filtered
    let incomes = db
        .select_income(user_id, DateRange::all())
        .await
        .pub_result(ErrorType::Database)?;
    let expenses = db
        .select_expenses(user_id, DateRange::all())
        .await
        .pub_result(ErrorType::Database)?;
    let goals = db
        .select_goals(user_id)
        .await
        .pub_result(ErrorType::Database)?;
    let report = compose_weekly(&incomes, &expenses, &goals, today);

    let mut message = format!(
        "Weekly report {} to {}: income {}, expenses {}, savings {} ({:.1}%)",
        report.window_start,
        report.window_end,
        Amount::new(report.total_income),
        Amount::new(report.total_expenses),
        Amount::new(report.savings),
        report.savings_rate,
    );

    if !args.send() {
        return Ok(Out::new(
            message,
            WeeklyOutcome {
                report,
                delivered: None,
                skipped: None,
            },
        ));
    }

    let settings = db
        .load_settings(user_id)
        .await
        .pub_result(ErrorType::Database)?;
    let skipped = if !allows(&settings, AlertKind::WeeklyReport) {
        Some("weekly reports are disabled in settings".to_string())
    } else if args.if_due() {
        let last = db
            .last_alert(user_id, AlertKind::WeeklyReport)
            .await
            .pub_result(ErrorType::Database)?;
        (!is_due(today, last)).then(|| "the weekly report is not due today".to_string())
    } else {
        None
    };

    if let Some(reason) = skipped {
        info!("Not sending the weekly report: {reason}");
        message.push_str(&format!("\nNot sent: {reason}"));
        return Ok(Out::new(
            message,
            WeeklyOutcome {
                report,
                delivered: None,
                skipped: Some(reason),
            },
        ));
    }

    let email = weekly_report_email(config.email(), &report);
    let delivered = match dispatcher(mode, config.relay_url()) {
        Ok(dispatcher) => deliver(dispatcher.as_ref(), &email).await,
        Err(e) => {
            warn!("Unable to create the email dispatcher: {e:#}");
            false
        }
    };
    if delivered {
        if let Err(e) = db.log_alert(user_id, AlertKind::WeeklyReport, now).await {
            warn!("Unable to record the weekly report: {e:#}");
        }
        message.push_str(&format!("\nSent to {}", config.email()));
    } else {
        message.push_str("\nThe report could not be delivered");
    }

    Ok(Out::new(
        message,
        WeeklyOutcome {
            report,
            delivered: Some(delivered),
            skipped: None,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::SetSettingsArgs;
    use crate::commands::update_settings;
    use crate::email::WEEKLY_SUBJECT;
    use crate::model::Category;
    use crate::test::{noon, TestEnv};
    use rust_decimal::Decimal;

    // 2025-03-10 is a Monday
    const MONDAY: &str = "2025-03-10";

    #[tokio::test]
    async fn test_compose_only() {
        let env = TestEnv::new().await;
        env.insert_income("1000", "Stipend", "2025-03-05").await;
        env.insert_expense("250", Category::Food, "2025-03-06").await;
        env.insert_expense("999", Category::Food, "2025-02-01").await;

        let out = weekly_report_at(
            env.config(),
            Mode::Testing,
            WeeklyReportArgs::new(false, false),
            noon(MONDAY),
        )
        .await
        .unwrap();
        let outcome = out.structure().unwrap();
        assert_eq!(outcome.report.total_expenses, Decimal::from(250));
        assert_eq!(outcome.report.savings, Decimal::from(750));
        assert_eq!(outcome.delivered, None);
        assert!(env.sent().is_empty());
    }

    #[tokio::test]
    async fn test_if_due_sends_once_per_monday() {
        let env = TestEnv::new().await;
        let send = |at: &str| {
            weekly_report_at(
                env.config(),
                Mode::Testing,
                WeeklyReportArgs::new(false, true),
                noon(at),
            )
        };

        let first = send(MONDAY).await.unwrap();
        assert_eq!(first.structure().unwrap().delivered, Some(true));

        let second = send(MONDAY).await.unwrap();
        assert_eq!(second.structure().unwrap().delivered, None);
        assert!(second.structure().unwrap().skipped.is_some());

        let tuesday = send("2025-03-11").await.unwrap();
        assert_eq!(tuesday.structure().unwrap().delivered, None);

        let next_monday = send("2025-03-17").await.unwrap();
        assert_eq!(next_monday.structure().unwrap().delivered, Some(true));

        let sent = env.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].subject, WEEKLY_SUBJECT);
    }

    #[tokio::test]
    async fn test_disabled_weekly_report_is_not_sent() {
        let env = TestEnv::new().await;
        update_settings(env.config(), SetSettingsArgs::default().with_weekly_report(false))
            .await
            .unwrap();
        let out = weekly_report_at(
            env.config(),
            Mode::Testing,
            WeeklyReportArgs::new(true, false),
            noon(MONDAY),
        )
        .await
        .unwrap();
        assert!(out.structure().unwrap().skipped.is_some());
        assert!(env.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_on_any_day_without_if_due() {
        let env = TestEnv::new().await;
        let out = weekly_report_at(
            env.config(),
            Mode::Testing,
            WeeklyReportArgs::new(true, false),
            noon("2025-03-12"),
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().delivered, Some(true));
        assert_eq!(env.sent().len(), 1);
    }
}
