use clap::Parser;
use eduwallet::args::{
    AlertsCommand, Args, Command, ExpenseCommand, GoalCommand, IncomeCommand, ReportCommand,
    SettingsCommand,
};
use eduwallet::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().eduwallet_home().path();

    // This allows for running the program without sending email. When EDUWALLET_IN_TEST_MODE is
    // set and non-zero in length, then the mode will be Mode::Testing, otherwise Mode::Live.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.email(), init_args.relay_url())
                .await?
                .print()
        }

        Command::Income(income_args) => {
            let config = Config::load(home).await?;
            match income_args.command() {
                IncomeCommand::Add(args) => {
                    commands::add_income(config, args.clone()).await?.print()
                }
                IncomeCommand::List => commands::list_income(config).await?.print(),
                IncomeCommand::Delete(args) => {
                    commands::delete_income(config, args.clone()).await?.print()
                }
            }
        }

        Command::Expense(expense_args) => {
            let config = Config::load(home).await?;
            match expense_args.command() {
                ExpenseCommand::Add(args) => commands::add_expense(config, mode, args.clone())
                    .await?
                    .print(),
                ExpenseCommand::List => commands::list_expenses(config).await?.print(),
                ExpenseCommand::Delete(args) => {
                    commands::delete_expense(config, args.clone()).await?.print()
                }
            }
        }

        Command::Goal(goal_args) => {
            let config = Config::load(home).await?;
            match goal_args.command() {
                GoalCommand::Add(args) => commands::add_goal(config, args.clone()).await?.print(),
                GoalCommand::List => commands::list_goals(config).await?.print(),
                GoalCommand::Progress(args) => {
                    commands::update_goal_progress(config, args.clone())
                        .await?
                        .print()
                }
                GoalCommand::Delete(args) => {
                    commands::delete_goal(config, args.clone()).await?.print()
                }
            }
        }

        Command::Transactions(transactions_args) => {
            let config = Config::load(home).await?;
            commands::list_transactions(config, transactions_args.clone())
                .await?
                .print()
        }

        Command::Analytics(analytics_args) => {
            let config = Config::load(home).await?;
            commands::analytics(config, analytics_args.clone())
                .await?
                .print()
        }

        Command::Report(report_args) => {
            let config = Config::load(home).await?;
            match report_args.command() {
                ReportCommand::Weekly(args) => commands::weekly_report(config, mode, args.clone())
                    .await?
                    .print(),
            }
        }

        Command::Alerts(alerts_args) => {
            let config = Config::load(home).await?;
            match alerts_args.command() {
                AlertsCommand::Check(args) => commands::check_alerts(config, mode, args.clone())
                    .await?
                    .print(),
            }
        }

        Command::Settings(settings_args) => {
            let config = Config::load(home).await?;
            match settings_args.command() {
                SettingsCommand::Show => commands::show_settings(config).await?.print(),
                SettingsCommand::Set(args) => commands::update_settings(config, args.clone())
                    .await?
                    .print(),
            }
        }

        Command::Relay(relay_args) => commands::relay(relay_args.clone()).await?.print(),

        Command::Mcp(_mcp_args) => commands::mcp(Config::load(home).await?, mode)
            .await?
            .print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
