//! These structs provide the CLI interface for the eduwallet CLI.
//!
//! Several of the argument structs are also the parameter types of MCP tools, which is why they
//! derive `Deserialize` and `JsonSchema` alongside the clap traits.

use crate::aggregate::TimeRange;
use crate::model::{Category, RepeatPolicy};
use crate::relay::{DEFAULT_BIND, DEFAULT_FROM};
use clap::{Parser, Subcommand};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// eduwallet: a personal finance tracker for students.
///
/// Record income and expenses, track savings goals, look at where your money goes, and get
/// email alerts when a single expense is unusually large or when you go over your monthly
/// budget. A weekly report summarizes the last seven days.
///
/// Emails are delivered through a small relay service (see `eduwallet relay`) that holds the
/// mail provider's API key.
///
/// There is also a mode in which an AI agent can use this program through the mcp subcommand.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and the database.
    ///
    /// This is the first command you should run. By default data is stored in $HOME/eduwallet;
    /// pass --eduwallet-home to put it somewhere else.
    Init(InitArgs),
    /// Add, list or delete income.
    Income(IncomeArgs),
    /// Add, list or delete expenses. Adding an expense may send alert emails.
    Expense(ExpenseArgs),
    /// Add, list, update or delete savings goals.
    Goal(GoalArgs),
    /// List income and expenses together, newest first.
    Transactions(TransactionsArgs),
    /// Show totals, savings and breakdowns by category and source.
    Analytics(AnalyticsArgs),
    /// Build, and optionally send, financial reports.
    Report(ReportArgs),
    /// Check the current month for large expenses and budget overruns.
    Alerts(AlertsArgs),
    /// Show or change notification settings.
    Settings(SettingsArgs),
    /// Run the email relay HTTP service.
    Relay(RelayArgs),
    /// Run as an MCP server over stdio for AI agents.
    Mcp(McpArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where eduwallet data and configuration is held. Defaults to ~/eduwallet
    #[arg(long, env = "EDUWALLET_HOME", default_value_t = default_eduwallet_home())]
    eduwallet_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, eduwallet_home: PathBuf) -> Self {
        Self {
            log_level,
            eduwallet_home: eduwallet_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn eduwallet_home(&self) -> &DisplayPath {
        &self.eduwallet_home
    }
}

/// Args for the `eduwallet init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The email address that alerts and reports are sent to.
    #[arg(long)]
    email: String,

    /// The send-email endpoint of the relay. Defaults to http://localhost:8888/send-email
    #[arg(long)]
    relay_url: Option<String>,
}

impl InitArgs {
    pub fn new(email: impl Into<String>, relay_url: Option<String>) -> Self {
        Self {
            email: email.into(),
            relay_url,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn relay_url(&self) -> Option<&str> {
        self.relay_url.as_deref()
    }
}

/// Args for the `eduwallet income` command.
#[derive(Debug, Parser, Clone)]
pub struct IncomeArgs {
    #[command(subcommand)]
    command: IncomeCommand,
}

impl IncomeArgs {
    pub fn command(&self) -> &IncomeCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum IncomeCommand {
    /// Record income.
    Add(AddIncomeArgs),
    /// List all income, newest first, with the total.
    List,
    /// Delete an income record by id.
    Delete(DeleteArgs),
}

/// Args for `eduwallet income add`.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddIncomeArgs {
    /// The amount received, e.g. 1500 or ₹1,500.00. Must be greater than zero.
    #[arg(long)]
    amount: String,

    /// Where the money came from, e.g. "Scholarship" or "Part-time job".
    #[arg(long)]
    source: String,

    /// An optional note.
    #[arg(long)]
    description: Option<String>,

    /// The date received, as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<String>,
}

impl AddIncomeArgs {
    pub fn new(
        amount: impl Into<String>,
        source: impl Into<String>,
        description: Option<String>,
        date: Option<String>,
    ) -> Self {
        Self {
            amount: amount.into(),
            source: source.into(),
            description,
            date,
        }
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

/// Args for the `eduwallet expense` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    command: ExpenseCommand,
}

impl ExpenseArgs {
    pub fn command(&self) -> &ExpenseCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExpenseCommand {
    /// Record an expense and send any alerts it triggers.
    Add(AddExpenseArgs),
    /// List all expenses, newest first, flagging those above their category limit.
    List,
    /// Delete an expense by id.
    Delete(DeleteArgs),
}

/// Args for `eduwallet expense add`.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddExpenseArgs {
    /// The amount spent, e.g. 250 or ₹250.00. Must be greater than zero.
    #[arg(long)]
    amount: String,

    /// The expense category.
    #[arg(long, value_enum, ignore_case = true)]
    category: Category,

    /// An optional note.
    #[arg(long)]
    description: Option<String>,

    /// The date of the expense, as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<String>,
}

impl AddExpenseArgs {
    pub fn new(
        amount: impl Into<String>,
        category: Category,
        description: Option<String>,
        date: Option<String>,
    ) -> Self {
        Self {
            amount: amount.into(),
            category,
            description,
            date,
        }
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

/// Args for the `eduwallet goal` command.
#[derive(Debug, Parser, Clone)]
pub struct GoalArgs {
    #[command(subcommand)]
    command: GoalCommand,
}

impl GoalArgs {
    pub fn command(&self) -> &GoalCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum GoalCommand {
    /// Create a savings goal.
    Add(AddGoalArgs),
    /// List goals with their progress, days remaining and amount still needed.
    List,
    /// Set how much has been saved towards a goal.
    Progress(GoalProgressArgs),
    /// Delete a goal by id.
    Delete(DeleteArgs),
}

/// Args for `eduwallet goal add`.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddGoalArgs {
    /// What you are saving for.
    #[arg(long)]
    title: String,

    /// The amount to save. Must be greater than zero.
    #[arg(long)]
    target_amount: String,

    /// How much has already been saved. Defaults to 0.
    #[arg(long)]
    current_amount: Option<String>,

    /// When the goal should be reached, as YYYY-MM-DD.
    #[arg(long)]
    target_date: String,
}

impl AddGoalArgs {
    pub fn new(
        title: impl Into<String>,
        target_amount: impl Into<String>,
        current_amount: Option<String>,
        target_date: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            target_amount: target_amount.into(),
            current_amount,
            target_date: target_date.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn target_amount(&self) -> &str {
        &self.target_amount
    }

    pub fn current_amount(&self) -> Option<&str> {
        self.current_amount.as_deref()
    }

    pub fn target_date(&self) -> &str {
        &self.target_date
    }
}

/// Args for `eduwallet goal progress`.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GoalProgressArgs {
    /// The id of the goal.
    #[arg(long)]
    id: String,

    /// The total amount saved so far (not an increment). Must not be negative.
    #[arg(long)]
    current_amount: String,
}

impl GoalProgressArgs {
    pub fn new(id: impl Into<String>, current_amount: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            current_amount: current_amount.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current_amount(&self) -> &str {
        &self.current_amount
    }
}

/// Identifies a record to delete.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteArgs {
    /// The id of the record.
    #[arg(long)]
    id: String,
}

impl DeleteArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// How `eduwallet transactions` renders its list.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// A markdown table.
    #[default]
    Table,
    /// A JSON array.
    Json,
    /// Comma separated values with a header row.
    Csv,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

/// Args for `eduwallet transactions`.
#[derive(Debug, Default, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransactionsArgs {
    /// How to render the list: table, json or csv.
    #[arg(long, default_value_t = OutputFormat::Table)]
    #[serde(default)]
    format: OutputFormat,

    /// Only show the most recent N transactions.
    #[arg(long)]
    limit: Option<usize>,
}

impl TransactionsArgs {
    pub fn new(format: OutputFormat, limit: Option<usize>) -> Self {
        Self { format, limit }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

/// Args for `eduwallet analytics`.
#[derive(Debug, Default, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyticsArgs {
    /// Which records to include: all, month (this calendar month) or week (the last 7 days).
    #[arg(long, default_value_t = TimeRange::All)]
    #[serde(default)]
    range: TimeRange,
}

impl AnalyticsArgs {
    pub fn new(range: TimeRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }
}

/// Args for the `eduwallet report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    #[command(subcommand)]
    command: ReportCommand,
}

impl ReportArgs {
    pub fn command(&self) -> &ReportCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ReportCommand {
    /// The report for the last seven days.
    Weekly(WeeklyReportArgs),
}

/// Args for `eduwallet report weekly`.
#[derive(Debug, Default, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WeeklyReportArgs {
    /// Email the report (if weekly reports are enabled in settings).
    #[arg(long)]
    #[serde(default)]
    send: bool,

    /// Only send when it is due: today is Monday and no weekly report was sent today. Suitable
    /// for running from a daily scheduler. Implies --send.
    #[arg(long)]
    #[serde(default)]
    if_due: bool,
}

impl WeeklyReportArgs {
    pub fn new(send: bool, if_due: bool) -> Self {
        Self { send, if_due }
    }

    pub fn send(&self) -> bool {
        self.send || self.if_due
    }

    pub fn if_due(&self) -> bool {
        self.if_due
    }
}

/// Args for the `eduwallet alerts` command.
#[derive(Debug, Parser, Clone)]
pub struct AlertsArgs {
    #[command(subcommand)]
    command: AlertsCommand,
}

impl AlertsArgs {
    pub fn command(&self) -> &AlertsCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum AlertsCommand {
    /// Check every expense of the current month and the month's total.
    Check(CheckAlertsArgs),
}

/// Args for `eduwallet alerts check`.
#[derive(Debug, Default, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckAlertsArgs {
    /// Email the alerts that notification settings allow.
    #[arg(long)]
    #[serde(default)]
    send: bool,
}

impl CheckAlertsArgs {
    pub fn new(send: bool) -> Self {
        Self { send }
    }

    pub fn send(&self) -> bool {
        self.send
    }
}

/// Args for the `eduwallet settings` command.
#[derive(Debug, Parser, Clone)]
pub struct SettingsArgs {
    #[command(subcommand)]
    command: SettingsCommand,
}

impl SettingsArgs {
    pub fn command(&self) -> &SettingsCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print the current notification settings.
    Show,
    /// Change one or more notification settings.
    Set(SetSettingsArgs),
}

/// Args for `eduwallet settings set`. Only the settings that are given are changed.
#[derive(Debug, Default, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetSettingsArgs {
    /// Master switch for all emails.
    #[arg(long)]
    email_notifications: Option<bool>,

    /// Whether the weekly report is emailed.
    #[arg(long)]
    weekly_report: Option<bool>,

    /// Whether budget-exceeded alerts are emailed.
    #[arg(long)]
    budget_alerts: Option<bool>,

    /// Whether large-expense alerts are emailed.
    #[arg(long)]
    large_expense_alerts: Option<bool>,

    /// The monthly spending limit, e.g. 1000.
    #[arg(long)]
    monthly_budget_limit: Option<String>,

    /// Whether a budget alert is sent for every expense while over budget (always) or only for
    /// the first one each month.
    #[arg(long, value_enum)]
    budget_alert_repeat: Option<RepeatPolicy>,
}

impl SetSettingsArgs {
    pub fn email_notifications(&self) -> Option<bool> {
        self.email_notifications
    }

    pub fn weekly_report(&self) -> Option<bool> {
        self.weekly_report
    }

    pub fn budget_alerts(&self) -> Option<bool> {
        self.budget_alerts
    }

    pub fn large_expense_alerts(&self) -> Option<bool> {
        self.large_expense_alerts
    }

    pub fn monthly_budget_limit(&self) -> Option<&str> {
        self.monthly_budget_limit.as_deref()
    }

    pub fn budget_alert_repeat(&self) -> Option<RepeatPolicy> {
        self.budget_alert_repeat
    }

    pub fn with_email_notifications(mut self, value: bool) -> Self {
        self.email_notifications = Some(value);
        self
    }

    pub fn with_weekly_report(mut self, value: bool) -> Self {
        self.weekly_report = Some(value);
        self
    }

    pub fn with_budget_alerts(mut self, value: bool) -> Self {
        self.budget_alerts = Some(value);
        self
    }

    pub fn with_large_expense_alerts(mut self, value: bool) -> Self {
        self.large_expense_alerts = Some(value);
        self
    }

    pub fn with_monthly_budget_limit(mut self, value: impl Into<String>) -> Self {
        self.monthly_budget_limit = Some(value.into());
        self
    }

    pub fn with_budget_alert_repeat(mut self, value: RepeatPolicy) -> Self {
        self.budget_alert_repeat = Some(value);
        self
    }
}

/// Args for the `eduwallet relay` command.
#[derive(Debug, Parser, Clone)]
pub struct RelayArgs {
    /// The address to listen on.
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: String,

    /// The sender shown on relayed emails.
    #[arg(long, default_value = DEFAULT_FROM)]
    from: String,

    /// The Resend API key.
    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    api_key: String,
}

impl RelayArgs {
    pub fn new(
        bind: impl Into<String>,
        from: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            bind: bind.into(),
            from: from.into(),
            api_key: api_key.into(),
        }
    }

    pub fn bind(&self) -> &str {
        &self.bind
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// Args for the `eduwallet mcp` command.
#[derive(Debug, Parser, Clone)]
pub struct McpArgs {}

fn default_eduwallet_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("eduwallet"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --eduwallet-home or EDUWALLET_HOME instead of relying on the \
                default directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("eduwallet")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
