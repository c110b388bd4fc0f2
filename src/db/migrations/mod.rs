//! Database schema migrations.
//!
//! Migration files are stored in this directory with the naming convention:
//! - `migration_NN_up.sql` - Upgrades schema from version `NN-1` to version `NN`
//! - `migration_NN_down.sql` - Downgrades schema from version `NN` to version `NN-1`

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::error::Res;

/// A database migration with up and down SQL.
struct Migration {
    /// The version this migration brings the database to (when going up).
    version: i32,
    /// SQL to execute when upgrading to this version.
    up_sql: &'static str,
    /// SQL to execute when downgrading from this version.
    down_sql: &'static str,
}

/// All available migrations in order.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        up_sql: include_str!("migration_01_up.sql"),
        down_sql: include_str!("migration_01_down.sql"),
    },
    Migration {
        version: 2,
        up_sql: include_str!("migration_02_up.sql"),
        down_sql: include_str!("migration_02_down.sql"),
    },
];

/// The schema version this build of the crate expects.
pub(crate) const CURRENT_VERSION: i32 = 2;

/// One step of a migration plan.
struct Step {
    sql: &'static str,
    /// The schema version once `sql` has run.
    leaves_at: i32,
}

fn migration(version: i32, from: i32, to: i32) -> Res<&'static Migration> {
    match MIGRATIONS.iter().find(|m| m.version == version) {
        Some(migration) => Ok(migration),
        None => bail!(
            "Migration {version} is needed to go from schema {from} to {to} but does not exist"
        ),
    }
}

/// The steps from schema `from` to schema `to`, upwards or downwards. Fails before anything runs
/// if a migration on the way is missing.
fn plan(from: i32, to: i32) -> Res<Vec<Step>> {
    if from <= to {
        ((from + 1)..=to)
            .map(|v| {
                migration(v, from, to).map(|m| Step {
                    sql: m.up_sql,
                    leaves_at: v,
                })
            })
            .collect()
    } else {
        ((to + 1)..=from)
            .rev()
            .map(|v| {
                migration(v, from, to).map(|m| Step {
                    sql: m.down_sql,
                    leaves_at: v - 1,
                })
            })
            .collect()
    }
}

/// Moves the schema from version `from` to version `to`. Each step commits together with its
/// `schema_version` row, so an interrupted run leaves the database at a known version.
pub(crate) async fn run(pool: &SqlitePool, from: i32, to: i32) -> Res<()> {
    let steps = plan(from, to)?;
    if steps.is_empty() {
        debug!("Schema already at version {to}");
        return Ok(());
    }
    for step in &steps {
        debug!("Migrating schema to version {:02}", step.leaves_at);
        apply(pool, step).await?;
    }
    debug!("Schema migrated from version {from} to {to}");
    Ok(())
}

async fn apply(pool: &SqlitePool, step: &Step) -> Res<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Unable to start a migration transaction")?;
    // may hold several statements
    tx.execute(step.sql)
        .await
        .with_context(|| format!("Migration to schema {} failed", step.leaves_at))?;
    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *tx)
        .await
        .context("Unable to clear schema_version")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(step.leaves_at)
        .execute(&mut *tx)
        .await
        .context("Unable to record the schema version")?;
    tx.commit()
        .await
        .context("Unable to commit the migration")?;
    Ok(())
}
