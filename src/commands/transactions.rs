//! The merged transaction list.

use crate::aggregate::merge_transactions;
use crate::args::{OutputFormat, TransactionsArgs};
use crate::commands::Out;
use crate::db::DateRange;
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{Amount, Transaction};
use crate::{Config, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Transactions rendered in the requested output format.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rows {
    /// JSON array of transaction objects.
    Json(serde_json::Value),
    /// Markdown table as a single formatted string.
    Table(String),
    /// CSV data as a properly escaped string.
    Csv(String),
}

impl Debug for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => write!(f, "Rows::Json({:?})", v),
            Rows::Table(s) => write!(f, "Rows::Table({} chars)", s.len()),
            Rows::Csv(s) => write!(f, "Rows::Csv({} chars)", s.len()),
        }
    }
}

impl Display for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => {
                if let Ok(s) = serde_json::to_string_pretty(v) {
                    write!(f, "{}", s)
                } else {
                    write!(f, "{:?}", v)
                }
            }
            Rows::Table(s) => write!(f, "{}", s),
            Rows::Csv(s) => write!(f, "{}", s),
        }
    }
}

/// Lists income and expenses together, newest first. On the same date income is listed before
/// expenses.
pub async fn list_transactions(config: Config, args: TransactionsArgs) -> Result<Out<Rows>> {
    let db = config.db();
    let incomes = db
        .select_income(config.user_id(), DateRange::all())
        .await
        .pub_result(ErrorType::Database)?;
    let expenses = db
        .select_expenses(config.user_id(), DateRange::all())
        .await
        .pub_result(ErrorType::Database)?;

    let mut transactions = merge_transactions(&incomes, &expenses);
    if let Some(limit) = args.limit() {
        transactions.truncate(limit);
    }

    let rows = match args.format() {
        OutputFormat::Json => Rows::Json(
            serde_json::to_value(&transactions)
                .context("Unable to serialize transactions")
                .pub_result(ErrorType::Database)?,
        ),
        OutputFormat::Table => Rows::Table(to_table(&transactions)),
        OutputFormat::Csv => Rows::Csv(to_csv(&transactions).pub_result(ErrorType::Database)?),
    };
    Ok(Out::new(
        format!("{} transactions\n{rows}", transactions.len()),
        rows,
    ))
}

const HEADERS: [&str; 6] = ["date", "kind", "title", "description", "amount", "id"];

fn to_table(transactions: &[Transaction]) -> String {
    let mut s = format!("| {} |\n", HEADERS.join(" | "));
    s.push_str(&format!("|{}\n", "---|".repeat(HEADERS.len())));
    for t in transactions {
        let cells = cells(t);
        let cells: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
        s.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    s
}

fn to_csv(transactions: &[Transaction]) -> Res<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for t in transactions {
        writer.write_record(cells(t))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Unable to finish writing CSV: {e}"))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

fn cells(t: &Transaction) -> [String; 6] {
    let sign = if t.signed_amount().is_sign_negative() { "-" } else { "+" };
    [
        t.date.to_string(),
        t.kind.to_string(),
        t.title(),
        t.display_description().to_string(),
        format!("{sign}{}", Amount::new(t.amount)),
        t.id.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use crate::test::TestEnv;

    async fn env() -> TestEnv {
        let env = TestEnv::new().await;
        env.insert_expense("40", Category::Food, "2025-03-02").await;
        env.insert_income("1,000", "Stipend", "2025-03-02").await;
        env.insert_expense("15", Category::Transport, "2025-03-03").await;
        env
    }

    #[tokio::test]
    async fn test_json_order() {
        let env = env().await;
        let out = list_transactions(env.config(), TransactionsArgs::new(OutputFormat::Json, None))
            .await
            .unwrap();
        let Some(Rows::Json(value)) = out.structure() else {
            panic!("expected json rows");
        };
        let kinds: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["expense", "income", "expense"]);
        assert_eq!(value[0]["label"], "Transport");
        assert_eq!(value[1]["label"], "Stipend");
    }

    #[tokio::test]
    async fn test_table_and_limit() {
        let env = env().await;
        let out = list_transactions(
            env.config(),
            TransactionsArgs::new(OutputFormat::Table, Some(2)),
        )
        .await
        .unwrap();
        let Some(Rows::Table(table)) = out.structure() else {
            panic!("expected a table");
        };
        let lines: Vec<&str> = table.lines().collect();
        // header, separator, two rows
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("Expense: Transport"));
        assert!(lines[3].contains("+₹1,000.00"));
    }

    #[tokio::test]
    async fn test_csv() {
        let env = env().await;
        let out = list_transactions(env.config(), TransactionsArgs::new(OutputFormat::Csv, None))
            .await
            .unwrap();
        let Some(Rows::Csv(text)) = out.structure() else {
            panic!("expected csv");
        };
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        // the amount contains a comma, so it must survive quoting
        assert_eq!(&records[1][4], "+₹1,000.00");
        assert_eq!(&records[2][4], "-₹40.00");
    }
}
