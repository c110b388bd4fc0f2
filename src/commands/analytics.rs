use crate::aggregate::{summarize, Summary, TimeRange};
use crate::args::AnalyticsArgs;
use crate::commands::{now, Out};
use crate::db::DateRange;
use crate::error::{ErrorType, IntoResult};
use crate::model::Amount;
use crate::{Config, Result};
use chrono::NaiveDate;

/// Totals, net savings, the savings rate and the breakdowns by category and by source, over
/// all records, the current calendar month or the last seven days.
pub async fn analytics(config: Config, args: AnalyticsArgs) -> Result<Out<Summary>> {
    analytics_on(config, args.range(), now().date()).await
}

async fn analytics_on(config: Config, range: TimeRange, today: NaiveDate) -> Result<Out<Summary>> {
    let range = match range.window(today) {
        Some((from, to)) => DateRange::between(from, to),
        None => DateRange::all(),
    };
    let db = config.db();
    let incomes = db
        .select_income(config.user_id(), range)
        .await
        .pub_result(ErrorType::Database)?;
    let expenses = db
        .select_expenses(config.user_id(), range)
        .await
        .pub_result(ErrorType::Database)?;
    let summary = summarize(&incomes, &expenses);

    let mut message = format!(
        "Income {} ({} records), expenses {} ({} records), net savings {} ({:.1}% of income)",
        Amount::new(summary.total_income),
        summary.income_count,
        Amount::new(summary.total_expenses),
        summary.expense_count,
        Amount::new(summary.net_savings),
        summary.savings_rate,
    );
    if !summary.by_category.is_empty() {
        message.push_str("\nSpending by category:");
        for share in &summary.by_category {
            message.push_str(&format!(
                "\n  {:<14}{:>12}  {:>5.1}%",
                share.key.to_string(),
                Amount::new(share.amount).to_string(),
                share.percentage
            ));
        }
    }
    if !summary.by_source.is_empty() {
        message.push_str("\nIncome by source:");
        for share in &summary.by_source {
            message.push_str(&format!(
                "\n  {:<14}{:>12}  {:>5.1}%",
                share.key,
                Amount::new(share.amount).to_string(),
                share.percentage
            ));
        }
    }
    Ok(Out::new(message, summary))
}
