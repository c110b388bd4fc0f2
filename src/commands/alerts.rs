//! The `alerts check` command and the delivery stage shared with `expense add`.

use crate::aggregate::month_window;
use crate::alerts::{self, gate, Alert, AlertKind};
use crate::args::CheckAlertsArgs;
use crate::commands::{now, Out};
use crate::db::DateRange;
use crate::email::alert_email;
use crate::error::{ErrorType, IntoResult};
use crate::model::NotificationSettings;
use crate::notify::{deliver, dispatcher};
use crate::{Config, Mode, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What happened to one alert that passed the notification gate.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AlertOutcome {
    pub kind: AlertKind,
    pub subject: String,
    pub delivered: bool,
}

/// The result of `alerts check`.
#[derive(Debug, Clone, Serialize)]
pub struct AlertCheck {
    /// Every alert the current month triggers, whether or not it may be sent.
    pub alerts: Vec<Alert>,
    /// The alerts that were sent. Empty unless `--send` was given.
    pub notifications: Vec<AlertOutcome>,
}

/// Runs the large-expense check over every expense of the current month and the budget check
/// over the month's total. With `--send` the alerts that the notification settings allow are
/// emailed.
///
/// # Errors
/// - Returns a database error if the month's expenses or the settings cannot be read.
pub async fn check_alerts(
    config: Config,
    mode: Mode,
    args: CheckAlertsArgs,
) -> Result<Out<AlertCheck>> {
    check_alerts_at(config, mode, args, now()).await
}

pub(crate) async fn check_alerts_at(
    config: Config,
    mode: Mode,
    args: CheckAlertsArgs,
    now: NaiveDateTime,
) -> Result<Out<AlertCheck>> {
    let (from, to) = month_window(now.date());
    let month = config
        .db()
        .select_expenses(config.user_id(), DateRange::between(from, to))
        .await
        .pub_result(ErrorType::Database)?;
    let settings = config
        .db()
        .load_settings(config.user_id())
        .await
        .pub_result(ErrorType::Database)?;

    let alerts = alerts::scan_month(&month, settings.monthly_budget_limit);
    let notifications = if args.send() {
        notify(&config, mode, &settings, alerts.clone(), now).await
    } else {
        Vec::new()
    };

    let mut message = match alerts.len() {
        0 => format!("No alerts for {}", from.format("%B %Y")),
        n => format!("{n} alert(s) for {}", from.format("%B %Y")),
    };
    for alert in &alerts {
        message.push_str(&format!("\n- {}", describe(alert)));
    }
    if args.send() {
        message.push_str(&format!("\n{}", summarize_outcomes(&notifications)));
    }

    Ok(Out::new(
        message,
        AlertCheck {
            alerts,
            notifications,
        },
    ))
}

/// Gates `alerts` against `settings` and emails the survivors, logging each delivery. The
/// caller passes the same settings it evaluated the alerts with.
///
/// Nothing in here is fatal. The action that raised the alerts has already happened, so every
/// failure is logged and reflected as `delivered: false` or as a skipped alert.
pub(super) async fn notify(
    config: &Config,
    mode: Mode,
    settings: &NotificationSettings,
    alerts: Vec<Alert>,
    now: NaiveDateTime,
) -> Vec<AlertOutcome> {
    if alerts.is_empty() {
        return Vec::new();
    }
    let db = config.db();
    let user_id = config.user_id();

    let last_budget_alert = match db.last_alert(user_id, AlertKind::BudgetExceeded).await {
        Ok(last) => last,
        Err(e) => {
            warn!("Unable to read the alert log: {e:#}");
            None
        }
    };

    let allowed = gate(alerts, settings, last_budget_alert, now);
    if allowed.is_empty() {
        debug!("No alerts passed the notification gate");
        return Vec::new();
    }

    let dispatcher = match dispatcher(mode, config.relay_url()) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            warn!("Unable to create the email dispatcher: {e:#}");
            return allowed
                .iter()
                .map(|alert| AlertOutcome {
                    kind: alert.kind(),
                    subject: alert_email(config.email(), alert).subject,
                    delivered: false,
                })
                .collect();
        }
    };

    let mut outcomes = Vec::with_capacity(allowed.len());
    for alert in &allowed {
        let email = alert_email(config.email(), alert);
        let delivered = deliver(dispatcher.as_ref(), &email).await;
        if delivered {
            if let Err(e) = db.log_alert(user_id, alert.kind(), now).await {
                warn!("Unable to record the {} alert: {e:#}", alert.kind());
            }
        }
        outcomes.push(AlertOutcome {
            kind: alert.kind(),
            subject: email.subject,
            delivered,
        });
    }
    outcomes
}

pub(super) fn describe(alert: &Alert) -> String {
    use crate::model::Amount;
    match alert {
        Alert::LargeExpense(a) => format!(
            "Large {} expense of {} on {} ({} over the {} limit)",
            a.category,
            Amount::new(a.amount),
            a.date,
            Amount::new(a.overspent),
            Amount::new(a.threshold)
        ),
        Alert::BudgetExceeded(a) => format!(
            "Monthly spending of {} is {} over the {} budget",
            Amount::new(a.total_monthly),
            Amount::new(a.overspent_amount),
            Amount::new(a.limit)
        ),
    }
}

pub(super) fn summarize_outcomes(outcomes: &[AlertOutcome]) -> String {
    let sent = outcomes.iter().filter(|o| o.delivered).count();
    let failed = outcomes.len() - sent;
    match (sent, failed) {
        (0, 0) => "No alert emails were sent".to_string(),
        (s, 0) => format!("Sent {s} alert email(s)"),
        (s, f) => format!("Sent {s} alert email(s), {f} could not be delivered"),
    }
}
