//! Types that represent the core data model, such as `ExpenseRecord`, `Goal` and `Transaction`.
mod amount;
mod category;
mod records;
mod settings;
mod transaction;

pub use amount::{parse_amount, Amount, AmountError, AmountFormat, CURRENCY};
pub(crate) use amount::{parse_non_negative, parse_positive};
pub use category::{threshold_for, Category, DEFAULT_THRESHOLD};
pub use records::{
    parse_date, ExpenseRecord, Goal, IncomeRecord, NewExpense, NewGoal, NewIncome, Record,
    DATE_FORMAT,
};
pub use settings::{NotificationSettings, RepeatPolicy, SettingsUpdates, DEFAULT_MONTHLY_LIMIT};
pub use transaction::{Kind, Transaction};
