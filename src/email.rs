//! Email templates for alerts and reports.
//!
//! Each template turns a structured payload into an `Email` ready for a `Dispatcher`. All text
//! that originates from the user is HTML escaped, and every percentage goes through
//! `percentage_share` so an empty total never divides by zero.

use crate::aggregate::percentage_share;
use crate::alerts::{Alert, BudgetExceededAlert, LargeExpenseAlert};
use crate::model::Amount;
use crate::report::WeeklyReport;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

pub const BUDGET_SUBJECT: &str = "🚨 Budget Limit Exceeded - EduWallet";
pub const WEEKLY_SUBJECT: &str = "📊 Your Weekly Financial Report - EduWallet";

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; color: #333; }
    .header { padding: 30px; color: white; text-align: center; }
    .content { padding: 20px; max-width: 600px; margin: 0 auto; }
    .card { background: #f8fafc; padding: 20px; border-radius: 10px; margin: 15px 0; }
    .positive { color: #10b981; font-weight: bold; }
    .negative { color: #ef4444; font-weight: bold; }
    .bar { background: #e5e7eb; border-radius: 10px; margin: 5px 0; }
    .fill { background: #10b981; border-radius: 10px; padding: 5px; color: white; text-align: center; }
    .tip { background: #f0fdf4; padding: 15px; border-radius: 8px; border-left: 5px solid #10b981; }
    .footer { text-align: center; padding: 20px; color: #6b7280; font-size: 12px; }
"#;

/// A message for the email relay. This is also the JSON body the relay accepts.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Renders whichever alert it is given.
pub fn alert_email(to: &str, alert: &Alert) -> Email {
    match alert {
        Alert::LargeExpense(a) => large_expense_email(to, a),
        Alert::BudgetExceeded(a) => budget_alert_email(to, a),
    }
}

pub fn large_expense_email(to: &str, alert: &LargeExpenseAlert) -> Email {
    let category = escape(&alert.category.to_string());
    let description = alert
        .description
        .as_deref()
        .map(escape)
        .unwrap_or_else(|| "No description provided".to_string());

    let body = format!(
        r#"<div class="card" style="border-left: 5px solid #f59e0b;">
  <h2>You've recorded a large expense</h2>
  <p><strong>Amount:</strong> <span class="negative">{amount}</span></p>
  <p><strong>Category:</strong> {category}</p>
  <p><strong>Description:</strong> {description}</p>
  <p><strong>Date:</strong> {date}</p>
  <p><strong>Category Limit:</strong> {threshold}</p>
  <p><strong>Exceeded by:</strong> {overspent}</p>
</div>
<div class="tip">
  <h3>💡 Spending Consideration</h3>
  <p>This expense exceeds your usual spending pattern for {category}. Consider:</p>
  <p>• Was this expense necessary or impulsive?</p>
  <p>• Can you offset this with reduced spending in other areas?</p>
  <p>• Review your budget to accommodate this expense</p>
</div>"#,
        amount = money(alert.amount),
        date = alert.date.format("%d %b %Y"),
        threshold = money(alert.threshold),
        overspent = money(alert.overspent),
    );

    Email {
        to: to.to_string(),
        subject: format!(
            "⚠️ Large {} Expense - {}",
            alert.category,
            money(alert.amount)
        ),
        html: page(
            "⚠️ Large Expense Alert",
            "EduWallet - Spending Alert",
            "#f59e0b",
            &body,
        ),
    }
}

pub fn budget_alert_email(to: &str, alert: &BudgetExceededAlert) -> Email {
    let mut categories = String::new();
    for c in &alert.top_categories {
        // writing to a String cannot fail
        let _ = writeln!(
            categories,
            r#"  <p><strong>{}:</strong> {}</p>"#,
            escape(&c.category.to_string()),
            money(c.amount)
        );
    }

    let body = format!(
        r#"<div class="card" style="border-left: 5px solid #ef4444;">
  <h2>Your monthly spending has exceeded the budget limit!</h2>
  <p><strong>Budget Limit:</strong> {limit}</p>
  <p><strong>Current Spending:</strong> <span class="negative">{total}</span></p>
  <p><strong>Overspent By:</strong> <span class="negative">{overspent}</span></p>
  <p><strong>Overspent %:</strong> <span class="negative">{pct}</span></p>
</div>
<div class="card">
  <h3>📊 Top Spending Categories</h3>
{categories}</div>
<div class="tip">
  <h3>💡 How to Get Back on Track</h3>
  <p>1. Review your spending in high-cost categories</p>
  <p>2. Consider reducing discretionary spending</p>
  <p>3. Set smaller weekly budgets for the rest of the month</p>
  <p>4. Look for areas where you can save money</p>
</div>"#,
        limit = money(alert.limit),
        total = money(alert.total_monthly),
        overspent = money(alert.overspent_amount),
        pct = percent(percentage_share(alert.overspent_amount, alert.limit)),
    );

    Email {
        to: to.to_string(),
        subject: BUDGET_SUBJECT.to_string(),
        html: page(
            "🚨 Budget Limit Exceeded",
            "EduWallet - Budget Alert",
            "#ef4444",
            &body,
        ),
    }
}

pub fn weekly_report_email(to: &str, report: &WeeklyReport) -> Email {
    let savings_class = if report.savings.is_sign_negative() && !report.savings.is_zero() {
        "negative"
    } else {
        "positive"
    };

    let mut categories = String::new();
    if report.top_categories.is_empty() {
        categories.push_str("  <p>No expenses recorded this week.</p>\n");
    }
    for c in &report.top_categories {
        let share = percentage_share(c.amount, report.total_expenses);
        let _ = writeln!(
            categories,
            r#"  <div><strong>{}:</strong> {}
    <div class="bar"><div class="fill" style="width: {width}%">{pct}</div></div>
  </div>"#,
            escape(&c.category.to_string()),
            money(c.amount),
            width = share.round_dp(1),
            pct = percent(share),
        );
    }

    let mut goals = String::new();
    if !report.goals.is_empty() {
        goals.push_str("<div class=\"card\">\n  <h2>🎯 Goals Progress</h2>\n");
        for g in &report.goals {
            let _ = writeln!(
                goals,
                r#"  <div><strong>{}:</strong> {} / {} ({})
    <div class="bar"><div class="fill" style="width: {width}%"></div></div>
  </div>"#,
                escape(&g.title),
                money(g.current_amount),
                money(g.target_amount),
                percent(g.progress),
                width = g.progress.round_dp(1),
            );
        }
        goals.push_str("</div>\n");
    }

    let tip = if savings_class == "positive" {
        "Great job! You're saving money. Consider investing your savings for long-term growth."
    } else {
        "Watch your spending! Try to reduce expenses in high-spending categories next week."
    };

    let body = format!(
        r#"<p>{start} to {end}</p>
<div class="card">
  <h2>💰 Financial Summary</h2>
  <p><strong>Total Income:</strong> <span class="positive">{income}</span></p>
  <p><strong>Total Expenses:</strong> <span class="negative">{expenses}</span></p>
  <p><strong>Net Savings:</strong> <span class="{savings_class}">{savings}</span></p>
  <p><strong>Savings Rate:</strong> <span class="{savings_class}">{rate}</span></p>
</div>
<div class="card">
  <h2>📈 Spending by Category</h2>
{categories}</div>
{goals}<div class="tip">
  <h3>💡 Financial Tip</h3>
  <p>{tip}</p>
</div>"#,
        start = report.window_start.format("%d %b %Y"),
        end = report.window_end.format("%d %b %Y"),
        income = money(report.total_income),
        expenses = money(report.total_expenses),
        savings = money(report.savings),
        rate = percent(report.savings_rate),
    );

    Email {
        to: to.to_string(),
        subject: WEEKLY_SUBJECT.to_string(),
        html: page(
            "📊 Your Weekly Financial Report",
            "EduWallet - Student Finance Tracker",
            "#10b981",
            &body,
        ),
    }
}

fn page(title: &str, tagline: &str, color: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>{STYLE}</style>
</head>
<body>
<div class="header" style="background: {color};">
  <h1>{title}</h1>
  <p>{tagline}</p>
</div>
<div class="content">
{body}
</div>
<div class="footer">
  <p>This is an automated message from EduWallet</p>
  <p>To manage your notification settings, run 'eduwallet settings'</p>
</div>
</body>
</html>
"#
    )
}

fn money(value: Decimal) -> String {
    Amount::new(value).to_string()
}

fn percent(value: Decimal) -> String {
    format!("{:.1}%", value.round_dp(1))
}

/// Escapes the characters that are significant in HTML text and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{CategorySpend, GoalStatus};
    use crate::model::{parse_date, Category, Goal};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn large() -> LargeExpenseAlert {
        LargeExpenseAlert {
            amount: dec("450"),
            category: Category::Food,
            description: Some("<b>Party</b> & snacks".into()),
            date: parse_date("2025-03-10").unwrap(),
            threshold: dec("300"),
            overspent: dec("150"),
        }
    }

    #[test]
    fn test_large_expense_subject_and_escaping() {
        let email = large_expense_email("s@uni.edu", &large());
        assert_eq!(email.to, "s@uni.edu");
        assert_eq!(email.subject, "⚠️ Large Food Expense - ₹450.00");
        assert!(email.html.contains("&lt;b&gt;Party&lt;/b&gt; &amp; snacks"));
        assert!(!email.html.contains("<b>Party"));
        assert!(email.html.contains("₹150.00"));
    }

    #[test]
    fn test_large_expense_without_description() {
        let alert = LargeExpenseAlert {
            description: None,
            ..large()
        };
        let email = alert_email("s@uni.edu", &Alert::LargeExpense(alert));
        assert!(email.html.contains("No description provided"));
    }

    #[test]
    fn test_budget_alert_email() {
        let alert = BudgetExceededAlert {
            total_monthly: dec("1250"),
            limit: dec("1000"),
            overspent_amount: dec("250"),
            top_categories: vec![CategorySpend {
                category: Category::Bills,
                amount: dec("900"),
            }],
        };
        let email = budget_alert_email("s@uni.edu", &alert);
        assert_eq!(email.subject, BUDGET_SUBJECT);
        assert!(email.html.contains("25.0%"));
        assert!(email.html.contains("Bills:</strong> ₹900.00"));
        assert!(email.html.contains("₹1,250.00"));
    }

    #[test]
    fn test_budget_alert_zero_limit_has_no_division() {
        let alert = BudgetExceededAlert {
            total_monthly: dec("10"),
            limit: Decimal::ZERO,
            overspent_amount: dec("10"),
            top_categories: vec![],
        };
        assert!(budget_alert_email("s@uni.edu", &alert)
            .html
            .contains("0.0%"));
    }

    #[test]
    fn test_weekly_report_email() {
        let goal = Goal {
            id: "g".into(),
            user_id: "u".into(),
            title: "Bike".into(),
            target_amount: dec("400"),
            current_amount: dec("100"),
            target_date: parse_date("2025-06-01").unwrap(),
        };
        let today = parse_date("2025-03-10").unwrap();
        let report = WeeklyReport {
            window_start: parse_date("2025-03-03").unwrap(),
            window_end: today,
            total_income: Decimal::ZERO,
            total_expenses: dec("80"),
            savings: dec("-80"),
            savings_rate: Decimal::ZERO,
            top_categories: vec![CategorySpend {
                category: Category::Food,
                amount: dec("80"),
            }],
            goals: vec![GoalStatus::new(&goal, today)],
        };
        let email = weekly_report_email("s@uni.edu", &report);
        assert_eq!(email.subject, WEEKLY_SUBJECT);
        assert!(email.html.contains("Watch your spending!"));
        assert!(email.html.contains("100.0%"));
        assert!(email.html.contains("Bike:</strong> ₹100.00 / ₹400.00 (25.0%)"));
        assert!(email.html.contains("-₹80.00"));
    }

    #[test]
    fn test_weekly_report_email_positive_savings() {
        let report = WeeklyReport {
            window_start: parse_date("2025-03-03").unwrap(),
            window_end: parse_date("2025-03-10").unwrap(),
            total_income: dec("100"),
            total_expenses: Decimal::ZERO,
            savings: dec("100"),
            savings_rate: dec("100"),
            top_categories: vec![],
            goals: vec![],
        };
        let email = weekly_report_email("s@uni.edu", &report);
        assert!(email.html.contains("Great job!"));
        assert!(email.html.contains("No expenses recorded this week."));
        assert!(!email.html.contains("Goals Progress"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a"b'c"#), "a&quot;b&#39;c");
    }
}
