use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The monthly expense ceiling used until the user sets their own.
pub const DEFAULT_MONTHLY_LIMIT: i64 = 1000;

/// Whether a budget-exceeded alert may be sent more than once in the same calendar month.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum RepeatPolicy {
    /// Every qualifying expense insert sends another budget alert.
    #[default]
    Always,
    /// Only the first budget alert of each calendar month is sent.
    OncePerMonth,
}

serde_plain::derive_display_from_serialize!(RepeatPolicy);
serde_plain::derive_fromstr_from_deserialize!(RepeatPolicy);

/// A user's notification preferences, persisted in the record store and loaded at the start of
/// every action that may send email.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationSettings {
    /// Master switch: when false no email is sent at all.
    pub email_notifications: bool,
    pub weekly_report: bool,
    pub budget_alerts: bool,
    pub large_expense_alerts: bool,
    pub monthly_budget_limit: Decimal,
    pub budget_alert_repeat: RepeatPolicy,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            weekly_report: true,
            budget_alerts: true,
            large_expense_alerts: true,
            monthly_budget_limit: Decimal::from(DEFAULT_MONTHLY_LIMIT),
            budget_alert_repeat: RepeatPolicy::Always,
        }
    }
}

/// A partial change to `NotificationSettings`. Fields left as `None` are not modified.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdates {
    pub email_notifications: Option<bool>,
    pub weekly_report: Option<bool>,
    pub budget_alerts: Option<bool>,
    pub large_expense_alerts: Option<bool>,
    pub monthly_budget_limit: Option<Decimal>,
    pub budget_alert_repeat: Option<RepeatPolicy>,
}

impl SettingsUpdates {
    pub fn is_empty(&self) -> bool {
        self == &SettingsUpdates::default()
    }
}

impl NotificationSettings {
    /// Returns a copy of these settings with `updates` applied.
    pub fn apply(&self, updates: &SettingsUpdates) -> Self {
        Self {
            email_notifications: updates
                .email_notifications
                .unwrap_or(self.email_notifications),
            weekly_report: updates.weekly_report.unwrap_or(self.weekly_report),
            budget_alerts: updates.budget_alerts.unwrap_or(self.budget_alerts),
            large_expense_alerts: updates
                .large_expense_alerts
                .unwrap_or(self.large_expense_alerts),
            monthly_budget_limit: updates
                .monthly_budget_limit
                .unwrap_or(self.monthly_budget_limit),
            budget_alert_repeat: updates
                .budget_alert_repeat
                .unwrap_or(self.budget_alert_repeat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = NotificationSettings::default();
        assert!(s.email_notifications && s.weekly_report && s.budget_alerts);
        assert!(s.large_expense_alerts);
        assert_eq!(s.monthly_budget_limit, Decimal::from(1000));
        assert_eq!(s.budget_alert_repeat, RepeatPolicy::Always);
    }

    #[test]
    fn test_apply_only_touches_given_fields() {
        let s = NotificationSettings::default();
        let updates = SettingsUpdates {
            budget_alerts: Some(false),
            monthly_budget_limit: Some(Decimal::from(1500)),
            ..Default::default()
        };
        let changed = s.apply(&updates);
        assert!(!changed.budget_alerts);
        assert_eq!(changed.monthly_budget_limit, Decimal::from(1500));
        assert!(changed.large_expense_alerts);
        assert!(changed.email_notifications);
    }

    #[test]
    fn test_repeat_policy_strings() {
        assert_eq!(RepeatPolicy::OncePerMonth.to_string(), "once_per_month");
        assert_eq!(
            "always".parse::<RepeatPolicy>().unwrap(),
            RepeatPolicy::Always
        );
        assert!(SettingsUpdates::default().is_empty());
    }
}
