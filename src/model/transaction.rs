use crate::model::{ExpenseRecord, IncomeRecord, Record};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Distinguishes the two kinds of record that make up a `Transaction`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Income,
    Expense,
}

serde_plain::derive_display_from_serialize!(Kind);
serde_plain::derive_fromstr_from_deserialize!(Kind);

/// An income or expense record, tagged with its kind, for chronological display. Transactions
/// are derived on demand and never stored.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub kind: Kind,
    pub id: String,
    pub amount: Decimal,
    /// The income source or the expense category.
    pub label: String,
    pub description: Option<String>,
    pub date: NaiveDate,
}

impl Transaction {
    /// A one-line title such as `Income: Scholarship` or `Expense: Food`.
    pub fn title(&self) -> String {
        match self.kind {
            Kind::Income => format!("Income: {}", self.label),
            Kind::Expense => format!("Expense: {}", self.label),
        }
    }

    /// The description, or the kind name when the record has none.
    pub fn display_description(&self) -> &str {
        match (&self.description, self.kind) {
            (Some(d), _) => d,
            (None, Kind::Income) => "Income",
            (None, Kind::Expense) => "Expense",
        }
    }

    /// The amount with a leading `+` for income and `-` for expenses.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            Kind::Income => self.amount,
            Kind::Expense => -self.amount,
        }
    }
}

impl From<&IncomeRecord> for Transaction {
    fn from(income: &IncomeRecord) -> Self {
        Self {
            kind: Kind::Income,
            id: income.id.clone(),
            amount: income.amount,
            label: income.source.clone(),
            description: income.description.clone(),
            date: income.date,
        }
    }
}

impl From<&ExpenseRecord> for Transaction {
    fn from(expense: &ExpenseRecord) -> Self {
        Self {
            kind: Kind::Expense,
            id: expense.id.clone(),
            amount: expense.amount,
            label: expense.category.to_string(),
            description: expense.description.clone(),
            date: expense.date,
        }
    }
}

impl Record for Transaction {
    fn amount(&self) -> Decimal {
        self.amount
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}
