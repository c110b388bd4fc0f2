use crate::args::SetSettingsArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{parse_non_negative, Amount, NotificationSettings, SettingsUpdates};
use crate::{Config, Result};
use anyhow::bail;

/// Prints the current notification settings. A user who never changed anything gets the
/// defaults: everything enabled, a 1000 monthly limit and repeated budget alerts.
pub async fn show_settings(config: Config) -> Result<Out<NotificationSettings>> {
    let settings = config
        .db()
        .load_settings(config.user_id())
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(describe(&settings), settings))
}

/// Changes the given settings and leaves the others as they are.
///
/// # Errors
/// - Returns a validation error if nothing was given to change or the limit is not a
///   non-negative amount.
/// - Returns a database error if the settings cannot be read or saved.
pub async fn update_settings(
    config: Config,
    args: SetSettingsArgs,
) -> Result<Out<NotificationSettings>> {
    let updates = updates(&args).pub_result(ErrorType::Validation)?;
    let db = config.db();
    let current = db
        .load_settings(config.user_id())
        .await
        .pub_result(ErrorType::Database)?;
    let settings = current.apply(&updates);
    db.save_settings(config.user_id(), &settings)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Settings updated\n{}", describe(&settings)),
        settings,
    ))
}

fn updates(args: &SetSettingsArgs) -> Res<SettingsUpdates> {
    let monthly_budget_limit = match args.monthly_budget_limit() {
        Some(text) => Some(parse_non_negative("monthly budget limit", text)?),
        None => None,
    };
    let updates = SettingsUpdates {
        email_notifications: args.email_notifications(),
        weekly_report: args.weekly_report(),
        budget_alerts: args.budget_alerts(),
        large_expense_alerts: args.large_expense_alerts(),
        monthly_budget_limit,
        budget_alert_repeat: args.budget_alert_repeat(),
    };
    if updates.is_empty() {
        bail!("No settings were given to change");
    }
    Ok(updates)
}

fn describe(settings: &NotificationSettings) -> String {
    let on_off = |b: bool| if b { "on" } else { "off" };
    format!(
        "email notifications: {}\nweekly report: {}\nbudget alerts: {}\nlarge expense alerts: {}\n\
        monthly budget limit: {}\nbudget alert repeat: {}",
        on_off(settings.email_notifications),
        on_off(settings.weekly_report),
        on_off(settings.budget_alerts),
        on_off(settings.large_expense_alerts),
        Amount::new(settings.monthly_budget_limit),
        settings.budget_alert_repeat,
    )
}
