//! Savings goal command handlers.

use crate::aggregate::GoalStatus;
use crate::args::{AddGoalArgs, DeleteArgs, GoalProgressArgs};
use crate::commands::{now, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{parse_non_negative, Amount, NewGoal};
use crate::{Config, Result};
use chrono::NaiveDate;

/// Creates a savings goal.
///
/// # Errors
/// - Returns a validation error if the title is empty, the target is not positive, the current
///   amount is negative or the target date is not `YYYY-MM-DD`.
/// - Returns a database error if the insert fails.
pub async fn add_goal(config: Config, args: AddGoalArgs) -> Result<Out<GoalStatus>> {
    let now = now();
    let goal = NewGoal::parse(
        args.title(),
        args.target_amount(),
        args.current_amount(),
        args.target_date(),
    )
    .pub_result(ErrorType::Validation)?;

    let goal = config
        .db()
        .insert_goal(config.user_id(), &goal, now)
        .await
        .pub_result(ErrorType::Database)?;
    let status = GoalStatus::new(&goal, now.date());
    Ok(Out::new(
        format!("Added goal '{}' (id {})\n{}", goal.title, goal.id, line(&status)),
        status,
    ))
}

/// Lists all goals with their progress, days remaining and the amount still needed.
pub async fn list_goals(config: Config) -> Result<Out<Vec<GoalStatus>>> {
    list_goals_on(config, now().date()).await
}

async fn list_goals_on(config: Config, today: NaiveDate) -> Result<Out<Vec<GoalStatus>>> {
    let goals = config
        .db()
        .select_goals(config.user_id())
        .await
        .pub_result(ErrorType::Database)?;
    let statuses: Vec<GoalStatus> = goals.iter().map(|g| GoalStatus::new(g, today)).collect();

    let mut message = format!("{} goals", statuses.len());
    for status in &statuses {
        message.push_str(&format!("\n{}: {}  ({})", status.title, line(status), status.id));
    }
    Ok(Out::new(message, statuses))
}

/// Sets the amount saved so far towards a goal. The amount replaces the previous value.
pub async fn update_goal_progress(
    config: Config,
    args: GoalProgressArgs,
) -> Result<Out<GoalStatus>> {
    let current = parse_non_negative("current amount", args.current_amount())
        .pub_result(ErrorType::Validation)?;
    let goal = config
        .db()
        .update_goal_progress(config.user_id(), args.id(), current)
        .await
        .pub_result(ErrorType::Database)?;
    let status = GoalStatus::new(&goal, now().date());
    Ok(Out::new(
        format!("Updated goal '{}': {}", goal.title, line(&status)),
        status,
    ))
}

/// Deletes a goal.
pub async fn delete_goal(config: Config, args: DeleteArgs) -> Result<Out<()>> {
    config
        .db()
        .delete_goal(config.user_id(), args.id())
        .await
        .pub_result(ErrorType::Database)?;
    Ok(format!("Deleted goal {}", args.id()).into())
}

fn line(status: &GoalStatus) -> String {
    let when = match status.days_remaining {
        d if status.completed => format!("completed, target date {} ({d} days)", status.target_date),
        d if d < 0 => format!("{} days overdue", -d),
        d => format!("{d} days left"),
    };
    format!(
        "{} of {} saved ({:.1}%), {} still needed, {when}",
        Amount::new(status.current_amount),
        Amount::new(status.target_amount),
        status.progress,
        Amount::new(status.amount_needed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::day;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_goal_lifecycle() {
        let env = crate::test::TestEnv::new().await;
        let out = add_goal(
            env.config(),
            AddGoalArgs::new("Laptop", "50000", Some("12500".into()), "2025-12-31"),
        )
        .await
        .unwrap();
        let id = out.structure().unwrap().id.clone();

        let out = list_goals_on(env.config(), day("2025-12-01")).await.unwrap();
        let goals = out.structure().unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].progress, Decimal::from(25));
        assert_eq!(goals[0].days_remaining, 30);
        assert_eq!(goals[0].amount_needed, Decimal::from(37500));

        let out = update_goal_progress(env.config(), GoalProgressArgs::new(&id, "60000"))
            .await
            .unwrap();
        let status = out.structure().unwrap();
        assert_eq!(status.progress, Decimal::from(100));
        assert_eq!(status.amount_needed, Decimal::ZERO);
        assert!(status.completed);

        delete_goal(env.config(), DeleteArgs::new(&id)).await.unwrap();
        let out = list_goals_on(env.config(), day("2025-12-01")).await.unwrap();
        assert!(out.structure().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_goal_validation() {
        let env = crate::test::TestEnv::new().await;
        let err = add_goal(
            env.config(),
            AddGoalArgs::new("", "1000", None, "2025-12-31"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);

        let err = add_goal(env.config(), AddGoalArgs::new("Bike", "0", None, "2025-12-31"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);

        let err = update_goal_progress(env.config(), GoalProgressArgs::new("x", "-1"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);

        let err = update_goal_progress(env.config(), GoalProgressArgs::new("missing", "10"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Database);
    }
}
