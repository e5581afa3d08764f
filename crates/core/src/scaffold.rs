//! Migration scaffolding - writes new migration unit stubs
//!
//! Order keys come from the wall clock in milliseconds. Rapid successive
//! creations in the same directory could otherwise collide, so the key is
//! bumped past any existing key, keeping creation order strictly ascending.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::MigrationResult;

/// Create a new migration stub in `directory`, returning the written path.
///
/// The file is named `<orderKey>-<name>.sql` and contains empty UP and DOWN
/// sections. The directory is created if absent.
pub fn create_migration(name: &str, directory: &Path) -> MigrationResult<PathBuf> {
    fs::create_dir_all(directory)?;

    let name = name.trim().replace(' ', "_").to_lowercase();
    let key = next_order_key(directory)?;
    let path = directory.join(format!("{}-{}.sql", key, name));

    let template = format!(
        "-- Migration: {}\n\
         -- Created: {}\n\n\
         -- up\n\n\n\
         -- down\n\n",
        name,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    fs::write(&path, template)?;

    info!("created migration {}", path.display());
    Ok(path)
}

/// Current wall clock in milliseconds, bumped past the largest order key
/// already present in the directory.
fn next_order_key(directory: &Path) -> MigrationResult<i64> {
    let mut key = Utc::now().timestamp_millis();

    let mut max_existing = 0i64;
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(existing) = digits.parse::<i64>() {
                max_existing = max_existing.max(existing);
            }
        }
    }

    if key <= max_existing {
        key = max_existing + 1;
    }
    Ok(key)
}
