//! Core types and structures for migrations
//!
//! Defines the transient descriptor produced by discovery, the persisted
//! ledger record, and the result types returned by apply operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A discovered migration unit, recomputed on every discovery pass
///
/// `name` is the identity key (the file stem); `order` is the leading integer
/// parsed from the name and is used only for sorting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationDescriptor {
    /// Leading integer order key, defines the global apply/revert sequence
    pub order: i64,
    /// Unique identifying name (file stem, e.g. `10-create_users`)
    pub name: String,
    /// Where the migration unit lives on disk
    pub location: PathBuf,
}

impl MigrationDescriptor {
    /// Sort key: order key first, full name as the deterministic tie-break.
    pub fn sort_key(&self) -> (i64, &str) {
        (self.order, self.name.as_str())
    }
}

/// A row of the persisted ledger table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Migration name, unique across the ledger
    pub name: String,
    /// When the apply transaction committed
    pub applied_at: DateTime<Utc>,
}

/// Outcome of applying a single migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The migration ran and its ledger record was committed
    Applied,
    /// The ledger already had a record; nothing was executed
    AlreadyApplied,
}

/// Result of a batch apply run
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// Number of migrations newly applied by this run
    pub applied_count: usize,
    /// Names of the migrations applied, in the order they ran
    pub applied: Vec<String>,
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Root directories scanned for migration files, in caller-given order
    pub roots: Vec<PathBuf>,
    /// Name of the ledger table
    pub table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("migrations")],
            table: "tidemark_migrations".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = MigrationConfig::default();
        assert_eq!(config.roots, vec![PathBuf::from("migrations")]);
        assert_eq!(config.table, "tidemark_migrations");
    }

    #[test]
    fn test_sort_key_orders_by_key_then_name() {
        let a = MigrationDescriptor {
            order: 10,
            name: "10-b".to_string(),
            location: PathBuf::from("p1/10-b.sql"),
        };
        let b = MigrationDescriptor {
            order: 10,
            name: "10-a".to_string(),
            location: PathBuf::from("p2/10-a.sql"),
        };
        let c = MigrationDescriptor {
            order: 2,
            name: "2-z".to_string(),
            location: PathBuf::from("p1/2-z.sql"),
        };

        let mut all = vec![a.clone(), b.clone(), c.clone()];
        all.sort_by(|x, y| x.sort_key().cmp(&y.sort_key()));
        assert_eq!(
            all.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            vec!["2-z", "10-a", "10-b"]
        );
    }
}
