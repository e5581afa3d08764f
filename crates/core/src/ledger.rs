//! The applied-migrations ledger
//!
//! A single persisted table mapping migration names to the time their apply
//! transaction committed. The unique constraint on `name` is the system's
//! only concurrency safety net: when two runs race past the applied check,
//! at most one insert commits and the loser surfaces a conflict.
//!
//! Writes go through the caller's transaction so that a ledger row and the
//! schema changes it records always commit or roll back together.

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::definitions::LedgerRecord;
use crate::error::{MigrationError, MigrationResult};

/// Persisted record of which migrations have been applied
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
}

impl Ledger {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist. Never drops or alters
    /// an existing one.
    pub async fn ensure_schema(&self, pool: &PgPool) -> MigrationResult<()> {
        sqlx::query(&self.create_table_sql()).execute(pool).await?;
        debug!("ledger table {} is present", self.table);
        Ok(())
    }

    /// Whether a migration name has a ledger record
    pub async fn is_applied(&self, pool: &PgPool, name: &str) -> MigrationResult<bool> {
        let row = sqlx::query(&self.check_sql())
            .bind(name)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    /// All ledger records, oldest first
    pub async fn applied(&self, pool: &PgPool) -> MigrationResult<Vec<LedgerRecord>> {
        let rows = sqlx::query(&self.select_all_sql()).fetch_all(pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(LedgerRecord {
                name: row.try_get("name")?,
                applied_at: row.try_get("applied_at")?,
            });
        }
        Ok(records)
    }

    /// Insert a record inside the caller's transaction.
    ///
    /// A unique violation means another run recorded the same name first and
    /// is surfaced as [`MigrationError::Conflict`].
    pub async fn record_applied(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> MigrationResult<()> {
        sqlx::query(&self.insert_sql())
            .bind(name)
            .execute(&mut **tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    MigrationError::Conflict(name.to_string())
                }
                _ => MigrationError::Database(e.to_string()),
            })?;
        Ok(())
    }

    /// Delete a record inside the caller's transaction.
    ///
    /// Deleting an absent name is an error; callers are expected to check
    /// [`Ledger::is_applied`] first.
    pub async fn record_reverted(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> MigrationResult<()> {
        let result = sqlx::query(&self.delete_sql())
            .bind(name)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MigrationError::NotApplied(name.to_string()));
        }
        Ok(())
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                name TEXT UNIQUE NOT NULL,\n    \
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()\n\
            );",
            self.table
        )
    }

    fn check_sql(&self) -> String {
        format!("SELECT name FROM {} WHERE name = $1", self.table)
    }

    fn select_all_sql(&self) -> String {
        format!(
            "SELECT name, applied_at FROM {} ORDER BY applied_at ASC, name ASC",
            self.table
        )
    }

    fn insert_sql(&self) -> String {
        format!("INSERT INTO {} (name) VALUES ($1)", self.table)
    }

    fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE name = $1", self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql() {
        let ledger = Ledger::new("tidemark_migrations");
        let sql = ledger.create_table_sql();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS tidemark_migrations"));
        assert!(sql.contains("name TEXT UNIQUE NOT NULL"));
        assert!(sql.contains("applied_at TIMESTAMPTZ NOT NULL DEFAULT now()"));
    }

    #[test]
    fn test_query_sql_uses_configured_table() {
        let ledger = Ledger::new("custom_ledger");
        assert_eq!(
            ledger.check_sql(),
            "SELECT name FROM custom_ledger WHERE name = $1"
        );
        assert_eq!(
            ledger.insert_sql(),
            "INSERT INTO custom_ledger (name) VALUES ($1)"
        );
        assert_eq!(
            ledger.delete_sql(),
            "DELETE FROM custom_ledger WHERE name = $1"
        );
    }
}
