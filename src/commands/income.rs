//! Income command handlers.

use crate::aggregate::total_of;
use crate::args::{AddIncomeArgs, DeleteArgs};
use crate::commands::{now, Listing, Out};
use crate::db::DateRange;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Amount, IncomeRecord, NewIncome};
use crate::{Config, Result};

/// Validates and stores a new income record.
///
/// # Errors
/// - Returns a validation error if the amount is not positive, the source is empty or the date
///   is not `YYYY-MM-DD`. Nothing is written in that case.
/// - Returns a database error if the insert fails.
pub async fn add_income(config: Config, args: AddIncomeArgs) -> Result<Out<IncomeRecord>> {
    let now = now();
    let income = NewIncome::parse(
        args.amount(),
        args.source(),
        args.description(),
        args.date(),
        now.date(),
    )
    .pub_result(ErrorType::Validation)?;

    let record = config
        .db()
        .insert_income(config.user_id(), &income, now)
        .await
        .pub_result(ErrorType::Database)?;

    Ok(Out::new(
        format!(
            "Added {} income from {} on {} (id {})",
            Amount::new(record.amount),
            record.source,
            record.date,
            record.id
        ),
        record,
    ))
}

/// Lists all income, newest first, with the total.
pub async fn list_income(config: Config) -> Result<Out<Listing<IncomeRecord>>> {
    let items = config
        .db()
        .select_income(config.user_id(), DateRange::all())
        .await
        .pub_result(ErrorType::Database)?;
    let total = total_of(&items);

    let mut message = format!("{} income records, total {}", items.len(), Amount::new(total));
    for income in &items {
        message.push_str(&format!(
            "\n{}  {:>12}  {}{}  ({})",
            income.date,
            Amount::new(income.amount).to_string(),
            income.source,
            income
                .description
                .as_deref()
                .map(|d| format!(": {d}"))
                .unwrap_or_default(),
            income.id
        ));
    }
    Ok(Out::new(message, Listing { items, total }))
}

/// Deletes one income record.
pub async fn delete_income(config: Config, args: DeleteArgs) -> Result<Out<()>> {
    config
        .db()
        .delete_income(config.user_id(), args.id())
        .await
        .pub_result(ErrorType::Database)?;
    Ok(format!("Deleted income {}", args.id()).into())
}
