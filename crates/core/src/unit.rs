//! Migration units and the loader abstraction
//!
//! A migration unit exposes a forward and a backward operation, each run
//! against a transactional database handle. Units are resolved through an
//! explicit [`UnitLoader`] rather than any ambient cache, so alternative
//! sources (compiled-in registries, plugins) can sit behind the same seam.
//!
//! The default loader reads `.sql` files split into `-- up` and `-- down`
//! sections.

use async_trait::async_trait;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlx::{Postgres, Transaction};
use std::fs;

use crate::definitions::MigrationDescriptor;
use crate::error::{MigrationError, MigrationResult};

/// A named piece of code performing schema changes in both directions.
///
/// Units are not required to be self-idempotent; at-most-once application is
/// the ledger's job.
#[async_trait]
pub trait MigrationUnit: Send + Sync + std::fmt::Debug {
    /// Apply the migration's schema changes
    async fn forward(&self, tx: &mut Transaction<'_, Postgres>) -> MigrationResult<()>;

    /// Reverse the migration's schema changes
    async fn backward(&self, tx: &mut Transaction<'_, Postgres>) -> MigrationResult<()>;
}

/// Resolves a discovered descriptor to an executable migration unit
pub trait UnitLoader: Send + Sync {
    fn load(&self, descriptor: &MigrationDescriptor) -> MigrationResult<Box<dyn MigrationUnit>>;
}

/// Default loader: reads the descriptor's file and parses its UP and DOWN
/// sections into a [`SqlUnit`]
#[derive(Debug, Default)]
pub struct SqlUnitLoader;

impl UnitLoader for SqlUnitLoader {
    fn load(&self, descriptor: &MigrationDescriptor) -> MigrationResult<Box<dyn MigrationUnit>> {
        let content = fs::read_to_string(&descriptor.location)?;
        let (up_sql, down_sql) = parse_sections(&content);

        Ok(Box::new(SqlUnit {
            name: descriptor.name.clone(),
            up_sql,
            down_sql,
        }))
    }
}

/// A migration unit backed by raw SQL in both directions
#[derive(Debug, Clone)]
pub struct SqlUnit {
    name: String,
    up_sql: String,
    down_sql: String,
}

impl SqlUnit {
    pub fn up_sql(&self) -> &str {
        &self.up_sql
    }

    pub fn down_sql(&self) -> &str {
        &self.down_sql
    }

    async fn run_sql(&self, sql: &str, tx: &mut Transaction<'_, Postgres>) -> MigrationResult<()> {
        if sql.trim().is_empty() {
            return Ok(());
        }

        for statement in split_statements(sql) {
            sqlx::query(&statement)
                .execute(&mut **tx)
                .await
                .map_err(|e| MigrationError::Unit {
                    name: self.name.clone(),
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }
}

#[async_trait]
impl MigrationUnit for SqlUnit {
    async fn forward(&self, tx: &mut Transaction<'_, Postgres>) -> MigrationResult<()> {
        self.run_sql(&self.up_sql, tx).await
    }

    async fn backward(&self, tx: &mut Transaction<'_, Postgres>) -> MigrationResult<()> {
        self.run_sql(&self.down_sql, tx).await
    }
}

/// Parse migration file content into its UP and DOWN SQL sections.
///
/// Section markers are comment lines starting with `-- up` / `-- down`;
/// other comment lines and blanks are dropped. Text before the first marker
/// is ignored.
pub fn parse_sections(content: &str) -> (String, String) {
    let mut up_sql = Vec::new();
    let mut down_sql = Vec::new();
    let mut current_section = "";

    for line in content.lines() {
        let trimmed = line.trim().to_lowercase();

        if trimmed.starts_with("-- up") {
            current_section = "up";
            continue;
        } else if trimmed.starts_with("-- down") {
            current_section = "down";
            continue;
        }

        if line.trim().is_empty() || line.trim().starts_with("--") {
            continue;
        }

        match current_section {
            "up" => up_sql.push(line),
            "down" => down_sql.push(line),
            _ => {}
        }
    }

    (
        up_sql.join("\n").trim().to_string(),
        down_sql.join("\n").trim().to_string(),
    )
}

/// Split SQL into individual statements using proper SQL parsing.
///
/// Falls back to naive semicolon splitting when the parser rejects the input,
/// since migrations may use dialect features the parser does not know.
pub fn split_statements(sql: &str) -> Vec<String> {
    let dialect = GenericDialect {};

    match Parser::parse_sql(&dialect, sql) {
        Ok(parsed) => parsed.into_iter().map(|stmt| format!("{};", stmt)).collect(),
        Err(e) => {
            tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
            sql.split(';')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| format!("{};", s))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::descriptor_from_path;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
-- Migration: add email
-- Created: 2026-08-23

-- up
ALTER TABLE users ADD COLUMN email TEXT;

-- down
ALTER TABLE users DROP COLUMN email;
";

    #[test]
    fn test_parse_sections() {
        let (up, down) = parse_sections(SAMPLE);
        assert_eq!(up, "ALTER TABLE users ADD COLUMN email TEXT;");
        assert_eq!(down, "ALTER TABLE users DROP COLUMN email;");
    }

    #[test]
    fn test_parse_sections_empty_stub() {
        let (up, down) = parse_sections("-- up\n\n\n-- down\n\n");
        assert!(up.is_empty());
        assert!(down.is_empty());
    }

    #[test]
    fn test_parse_sections_ignores_leading_text() {
        let (up, down) = parse_sections("SELECT 1;\n-- up\nSELECT 2;\n-- down\nSELECT 3;\n");
        assert_eq!(up, "SELECT 2;");
        assert_eq!(down, "SELECT 3;");
    }

    #[test]
    fn test_split_statements_multiple() {
        let statements =
            split_statements("CREATE TABLE a (id INT); CREATE TABLE b (id INT);");
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE a"));
        assert!(statements[1].starts_with("CREATE TABLE b"));
    }

    #[test]
    fn test_split_statements_naive_fallback() {
        // Not valid SQL for the parser, so the fallback splits on semicolons.
        let statements = split_statements("FROB the widget; WIBBLE twice");
        assert_eq!(
            statements,
            vec!["FROB the widget;".to_string(), "WIBBLE twice;".to_string()]
        );
    }

    #[test]
    fn test_sql_unit_loader_reads_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("20-add_email.sql");
        fs::write(&path, SAMPLE).unwrap();

        let descriptor = descriptor_from_path(&path).unwrap();
        SqlUnitLoader.load(&descriptor).unwrap();
    }

    #[test]
    fn test_sql_unit_loader_missing_file() {
        let descriptor = descriptor_from_path(std::path::Path::new("5-gone.sql")).unwrap();
        let err = SqlUnitLoader.load(&descriptor).unwrap_err();
        assert!(matches!(err, crate::error::MigrationError::Io(_)));
    }
}
