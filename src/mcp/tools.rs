//! The MCP tools. Each tool is a thin wrapper around the command handler of the same name.

use crate::args::{
    AddExpenseArgs, AddGoalArgs, AddIncomeArgs, AnalyticsArgs, CheckAlertsArgs, DeleteArgs,
    GoalProgressArgs, SetSettingsArgs, TransactionsArgs, WeeklyReportArgs,
};
use crate::commands;
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::EduWalletServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use tracing::info;

#[tool_router(vis = "pub(super)")]
impl EduWalletServer {
    #[tool]
    /// Initialize the eduwallet MCP service for this session and return usage instructions. You
    /// **MUST** call this **ONCE** before using other tools so that you have the full usage
    /// instructions. You **MAY** call it more than once if you have forgotten the usage
    /// instructions.
    async fn initialize_service(&self) -> Result<CallToolResult, McpError> {
        let mut initialized = self.initialized.lock().await;
        *initialized = true;
        Ok(CallToolResult::success(vec![rmcp::model::Content::text(
            include_str!("docs/INSTRUCTIONS.md"),
        )]))
    }

    /// Record income. `amount` must be greater than zero and may be written as `1500`,
    /// `1,500.00` or `₹1,500`. `date` is `YYYY-MM-DD` and defaults to today. Returns the stored
    /// record including its generated `id`.
    #[tool]
    async fn add_income(
        &self,
        Parameters(args): Parameters<AddIncomeArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: add_income called");
        tool_result(commands::add_income(self.config(), args).await)
    }

    /// List all income, newest first, together with the total.
    #[tool]
    async fn list_income(&self) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: list_income called");
        tool_result(commands::list_income(self.config()).await)
    }

    /// Delete an income record by `id`. Deleting an id that does not exist is an error.
    #[tool]
    async fn delete_income(
        &self,
        Parameters(args): Parameters<DeleteArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: delete_income called");
        tool_result(commands::delete_income(self.config(), args).await)
    }

    /// Record an expense and run the alert checks.
    ///
    /// # Alerts
    ///
    /// After the expense is stored two independent checks run:
    ///
    /// - **Large expense**: the amount is strictly above the category's limit (Food 300,
    ///   Transport 200, Entertainment 400, Education 1000, Shopping 500, Bills 800,
    ///   Healthcare 600, Other 500).
    /// - **Monthly budget**: the total of this calendar month's expenses is strictly above the
    ///   user's monthly budget limit (1000 unless changed with `update_settings`).
    ///
    /// Triggered alerts are emailed if the notification settings allow it. The result lists the
    /// alerts and whether each email was delivered. A failed email never undoes the expense.
    #[tool]
    async fn add_expense(
        &self,
        Parameters(args): Parameters<AddExpenseArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: add_expense called");
        tool_result(commands::add_expense(self.config(), self.mode, args).await)
    }

    /// List all expenses, newest first, with the total. Each expense carries `over_limit`, true
    /// when it is above its category's large-expense limit.
    #[tool]
    async fn list_expenses(&self) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: list_expenses called");
        tool_result(commands::list_expenses(self.config()).await)
    }

    /// Delete an expense by `id`. Deleting an id that does not exist is an error.
    #[tool]
    async fn delete_expense(
        &self,
        Parameters(args): Parameters<DeleteArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: delete_expense called");
        tool_result(commands::delete_expense(self.config(), args).await)
    }

    /// Create a savings goal. `target_date` is `YYYY-MM-DD`; `current_amount` defaults to 0.
    #[tool]
    async fn add_goal(
        &self,
        Parameters(args): Parameters<AddGoalArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: add_goal called");
        tool_result(commands::add_goal(self.config(), args).await)
    }

    /// List goals with progress (percent, capped at 100), days remaining (negative when
    /// overdue) and the amount still needed.
    #[tool]
    async fn list_goals(&self) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: list_goals called");
        tool_result(commands::list_goals(self.config()).await)
    }

    /// Set the total saved towards a goal. `current_amount` replaces the previous value; it is
    /// not added to it.
    #[tool]
    async fn update_goal_progress(
        &self,
        Parameters(args): Parameters<GoalProgressArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: update_goal_progress called");
        tool_result(commands::update_goal_progress(self.config(), args).await)
    }

    /// Delete a goal by `id`.
    #[tool]
    async fn delete_goal(
        &self,
        Parameters(args): Parameters<DeleteArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: delete_goal called");
        tool_result(commands::delete_goal(self.config(), args).await)
    }

    /// List income and expenses together, newest first, as `json`, a markdown `table` (the
    /// default) or `csv`. Use `limit` to get only the most recent transactions.
    #[tool]
    async fn list_transactions(
        &self,
        Parameters(args): Parameters<TransactionsArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: list_transactions called");
        tool_result(commands::list_transactions(self.config(), args).await)
    }

    /// Totals, net savings, savings rate, spending by category and income by source. `range` is
    /// `all` (default), `month` (this calendar month) or `week` (the last seven days).
    #[tool]
    async fn analytics(
        &self,
        Parameters(args): Parameters<AnalyticsArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: analytics called");
        tool_result(commands::analytics(self.config(), args).await)
    }

    /// Build the weekly report for the seven days ending today. With `send` the report is
    /// emailed when weekly reports are enabled. With `if_due` it is only sent on a Monday on
    /// which it has not been sent yet.
    #[tool]
    async fn weekly_report(
        &self,
        Parameters(args): Parameters<WeeklyReportArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: weekly_report called");
        tool_result(commands::weekly_report(self.config(), self.mode, args).await)
    }

    /// Check every expense of the current month against its category limit, and the month's
    /// total against the budget. With `send` the alerts allowed by the settings are emailed.
    #[tool]
    async fn check_alerts(
        &self,
        Parameters(args): Parameters<CheckAlertsArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: check_alerts called");
        tool_result(commands::check_alerts(self.config(), self.mode, args).await)
    }

    /// Show the notification settings.
    #[tool]
    async fn show_settings(&self) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: show_settings called");
        tool_result(commands::show_settings(self.config()).await)
    }

    /// Change notification settings. Only the fields that are given change; at least one must
    /// be given.
    #[tool]
    async fn update_settings(
        &self,
        Parameters(args): Parameters<SetSettingsArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: update_settings called");
        tool_result(commands::update_settings(self.config(), args).await)
    }
}
