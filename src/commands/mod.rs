//! Command handlers for the eduwallet CLI.
//!
//! This module contains implementations for all CLI subcommands. The MCP server calls the same
//! functions, so every handler returns an `Out` that works for both interfaces.

mod alerts;
mod analytics;
mod expense;
mod goal;
mod income;
mod init;
mod mcp;
mod relay;
mod report;
mod settings;
mod transactions;

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use alerts::{check_alerts, AlertCheck, AlertOutcome};
pub use analytics::analytics;
pub use expense::{add_expense, delete_expense, list_expenses, ExpenseAdded, ExpenseRow};
pub use goal::{add_goal, delete_goal, list_goals, update_goal_progress};
pub use income::{add_income, delete_income, list_income};
pub use init::init;
pub use mcp::mcp;
pub use relay::relay;
pub use report::{weekly_report, WeeklyOutcome};
pub use settings::{show_settings, update_settings};
pub use transactions::{list_transactions, Rows};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and MCP server interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// A list of records together with the sum of their amounts.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T>
where
    T: Serialize + Clone + Debug,
{
    pub items: Vec<T>,
    pub total: Decimal,
}

/// The local wall-clock time. Dates and timestamps are stored without a zone.
pub(crate) fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
