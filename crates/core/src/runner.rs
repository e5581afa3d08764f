//! Migration runner - orchestrates discovery, ordering, and execution
//!
//! Merges discovery output across roots, sorts by order key, reconciles
//! against the ledger, and drives the executor for batch or single-unit
//! operations. The runner never touches the database except through the
//! ledger and the executor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::definitions::{ApplyOutcome, MigrationConfig, MigrationDescriptor, RunReport};
use crate::discovery::{descriptor_from_path, scan};
use crate::error::{MigrationError, MigrationResult};
use crate::executor::Executor;
use crate::ledger::Ledger;
use crate::unit::{SqlUnitLoader, UnitLoader};

/// Drives migration discovery and execution against one database
pub struct MigrationRunner {
    roots: Vec<PathBuf>,
    ledger: Ledger,
    executor: Executor,
}

impl MigrationRunner {
    /// Create a runner with the default SQL-file unit loader
    pub fn new(pool: PgPool, config: MigrationConfig) -> Self {
        Self::with_loader(pool, config, Arc::new(SqlUnitLoader))
    }

    /// Create a runner with a custom unit loader
    pub fn with_loader(
        pool: PgPool,
        config: MigrationConfig,
        loader: Arc<dyn UnitLoader>,
    ) -> Self {
        let ledger = Ledger::new(config.table);
        let executor = Executor::new(pool, ledger.clone(), loader);
        Self {
            roots: config.roots,
            ledger,
            executor,
        }
    }

    /// Create a runner connected to the given database URL
    pub async fn from_url(database_url: &str, config: MigrationConfig) -> MigrationResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| MigrationError::Database(format!("failed to connect: {}", e)))?;
        Ok(Self::new(pool, config))
    }

    pub fn pool(&self) -> &PgPool {
        self.executor.pool()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Apply every pending migration in ascending order-key order.
    ///
    /// Fail-fast, resumable batch: each migration commits in its own
    /// transaction, so the first error halts iteration and propagates while
    /// everything already committed stays applied. A later run skips those
    /// and resumes at the failure point.
    pub async fn apply_all(&self) -> MigrationResult<RunReport> {
        self.ledger.ensure_schema(self.pool()).await?;

        let descriptors = self.discover_sorted()?;
        info!("discovered {} migration(s)", descriptors.len());

        let mut report = RunReport::default();
        for descriptor in &descriptors {
            match self.executor.apply_one(descriptor).await {
                Ok(ApplyOutcome::Applied) => {
                    report.applied.push(descriptor.name.clone());
                    report.applied_count += 1;
                }
                Ok(ApplyOutcome::AlreadyApplied) => {}
                Err(e) => {
                    warn!(
                        "halting batch at {} after {} newly applied: {}",
                        descriptor.name, report.applied_count, e
                    );
                    return Err(e);
                }
            }
        }

        Ok(report)
    }

    /// Apply the single migration at `location`. Already-applied is a logged
    /// no-op, not an error.
    pub async fn apply_at(&self, location: &Path) -> MigrationResult<ApplyOutcome> {
        let descriptor = self.descriptor_at(location)?;
        self.ledger.ensure_schema(self.pool()).await?;

        let outcome = self.executor.apply_one(&descriptor).await?;
        if outcome == ApplyOutcome::AlreadyApplied {
            info!("migration {} is already applied", descriptor.name);
        }
        Ok(outcome)
    }

    /// Revert the single migration at `location`. Reverting something never
    /// applied is a hard error.
    pub async fn revert_at(&self, location: &Path) -> MigrationResult<()> {
        let descriptor = self.descriptor_at(location)?;
        self.ledger.ensure_schema(self.pool()).await?;

        self.executor.revert_one(&descriptor).await
    }

    /// Every discovered migration in order, joined with whether the ledger
    /// has a record for it. Read-only apart from the schema bootstrap.
    pub async fn status(&self) -> MigrationResult<Vec<(MigrationDescriptor, bool)>> {
        self.ledger.ensure_schema(self.pool()).await?;

        let descriptors = self.discover_sorted()?;
        let applied: std::collections::HashSet<String> = self
            .ledger
            .applied(self.pool())
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect();

        Ok(descriptors
            .into_iter()
            .map(|d| {
                let is_applied = applied.contains(&d.name);
                (d, is_applied)
            })
            .collect())
    }

    fn discover_sorted(&self) -> MigrationResult<Vec<MigrationDescriptor>> {
        let mut descriptors = scan(&self.roots)?;
        sort_descriptors(&mut descriptors);
        Ok(descriptors)
    }

    fn descriptor_at(&self, location: &Path) -> MigrationResult<MigrationDescriptor> {
        if !location.is_file() {
            return Err(MigrationError::NotFound(location.to_path_buf()));
        }
        descriptor_from_path(location)
    }
}

/// Sort by order key ascending; equal keys fall back to the lexical name so
/// ordering stays deterministic across platforms.
pub fn sort_descriptors(descriptors: &mut [MigrationDescriptor]) {
    descriptors.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_stub(dir: &Path, name: &str) {
        fs::write(dir.join(name), "-- up\n\n-- down\n").unwrap();
    }

    #[test]
    fn test_discovery_sorts_ascending_across_roots() {
        let p1 = TempDir::new().unwrap();
        let p2 = TempDir::new().unwrap();
        write_stub(p1.path(), "10-create_users.sql");
        write_stub(p1.path(), "30-add_index.sql");
        write_stub(p2.path(), "20-add_email.sql");

        let mut descriptors =
            scan(&[p1.path().to_path_buf(), p2.path().to_path_buf()]).unwrap();
        sort_descriptors(&mut descriptors);

        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["10-create_users", "20-add_email", "30-add_index"]);
    }

    #[test]
    fn test_sort_is_numeric_not_lexical() {
        let root = TempDir::new().unwrap();
        write_stub(root.path(), "2-second.sql");
        write_stub(root.path(), "10-tenth.sql");

        let mut descriptors = scan(&[root.path().to_path_buf()]).unwrap();
        sort_descriptors(&mut descriptors);

        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["2-second", "10-tenth"]);
    }

    #[test]
    fn test_equal_order_keys_break_ties_by_name() {
        let root = TempDir::new().unwrap();
        write_stub(root.path(), "10-bravo.sql");
        write_stub(root.path(), "10-alpha.sql");

        let mut descriptors = scan(&[root.path().to_path_buf()]).unwrap();
        sort_descriptors(&mut descriptors);

        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["10-alpha", "10-bravo"]);
    }
}
