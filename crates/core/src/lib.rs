//! # tidemark-core: Transactional Schema Migrations
//!
//! Discovers ordered migration units on disk, tracks which ones have been
//! applied in a persistent ledger table, and applies or reverts them inside
//! per-migration transactions.
//!
//! The central guarantee: a migration's schema changes and its ledger row are
//! written by the same transaction, so a record never exists without the
//! schema effects it stands for, and a failed migration leaves no trace.

pub mod definitions;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod runner;
pub mod scaffold;
pub mod unit;

pub use definitions::*;
pub use discovery::{descriptor_from_path, scan};
pub use error::*;
pub use executor::Executor;
pub use ledger::Ledger;
pub use runner::MigrationRunner;
pub use scaffold::create_migration;
pub use unit::{MigrationUnit, SqlUnitLoader, UnitLoader};
