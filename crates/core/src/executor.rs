//! Migration executor - transactional apply and revert of one unit
//!
//! Each apply or revert runs inside a single scoped transaction that also
//! carries the ledger write. Commit happens only when both the unit's
//! operation and the ledger update succeed; on any error the transaction is
//! dropped and sqlx rolls it back, so neither the schema change nor the
//! ledger row survives a failure.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, info};

use crate::definitions::{ApplyOutcome, MigrationDescriptor};
use crate::error::{MigrationError, MigrationResult};
use crate::ledger::Ledger;
use crate::unit::UnitLoader;

/// Executes single migrations against the database
pub struct Executor {
    pool: PgPool,
    ledger: Ledger,
    loader: Arc<dyn UnitLoader>,
}

impl Executor {
    pub fn new(pool: PgPool, ledger: Ledger, loader: Arc<dyn UnitLoader>) -> Self {
        Self {
            pool,
            ledger,
            loader,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Apply one migration, or report it already applied without opening a
    /// transaction.
    pub async fn apply_one(
        &self,
        descriptor: &MigrationDescriptor,
    ) -> MigrationResult<ApplyOutcome> {
        if self.ledger.is_applied(&self.pool, &descriptor.name).await? {
            debug!("migration {} already applied, skipping", descriptor.name);
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let unit = self.loader.load(descriptor)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigrationError::Database(format!("failed to begin transaction: {}", e)))?;

        // Any `?` below drops `tx`, which rolls the transaction back.
        unit.forward(&mut tx).await?;
        self.ledger.record_applied(&mut tx, &descriptor.name).await?;

        tx.commit()
            .await
            .map_err(|e| MigrationError::Database(format!("failed to commit: {}", e)))?;

        info!("applied migration {}", descriptor.name);
        Ok(ApplyOutcome::Applied)
    }

    /// Revert one applied migration. Fails with
    /// [`MigrationError::NotApplied`] before opening a transaction when the
    /// ledger has no record of it.
    pub async fn revert_one(&self, descriptor: &MigrationDescriptor) -> MigrationResult<()> {
        if !self.ledger.is_applied(&self.pool, &descriptor.name).await? {
            return Err(MigrationError::NotApplied(descriptor.name.clone()));
        }

        let unit = self.loader.load(descriptor)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigrationError::Database(format!("failed to begin transaction: {}", e)))?;

        unit.backward(&mut tx).await?;
        self.ledger
            .record_reverted(&mut tx, &descriptor.name)
            .await?;

        tx.commit()
            .await
            .map_err(|e| MigrationError::Database(format!("failed to commit: {}", e)))?;

        info!("reverted migration {}", descriptor.name);
        Ok(())
    }
}
