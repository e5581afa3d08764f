//! Migration discovery - filesystem scanning for migration units
//!
//! Scans an ordered list of root directories for `.sql` migration files and
//! parses each into a [`MigrationDescriptor`]. Scanning is non-recursive and
//! never deduplicates by name; ordering across roots is the caller's job.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::definitions::MigrationDescriptor;
use crate::error::{MigrationError, MigrationResult};

const MIGRATION_EXTENSION: &str = "sql";

/// Scan the given roots for migration files.
///
/// Each root contributes its immediate `.sql` files; subdirectories and other
/// file types are ignored. A root that does not exist contributes nothing.
/// A file whose name has no parsable leading order key fails the whole pass
/// with [`MigrationError::InvalidName`] rather than being skipped or coerced.
pub fn scan(roots: &[PathBuf]) -> MigrationResult<Vec<MigrationDescriptor>> {
    let mut descriptors = Vec::new();

    for root in roots {
        if !root.exists() {
            debug!("migration root {} does not exist, skipping", root.display());
            continue;
        }

        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path
                .extension()
                .map_or(false, |ext| ext == MIGRATION_EXTENSION)
            {
                let descriptor = descriptor_from_path(&path)?;
                debug!(
                    "discovered migration {} (order {})",
                    descriptor.name, descriptor.order
                );
                descriptors.push(descriptor);
            }
        }
    }

    Ok(descriptors)
}

/// Parse a single migration file path into a descriptor.
///
/// The name is the file stem; the order key is the run of leading ASCII
/// digits in the stem.
pub fn descriptor_from_path(path: &Path) -> MigrationResult<MigrationDescriptor> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MigrationError::InvalidName {
            name: path.display().to_string(),
        })?
        .to_string();

    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    let order = digits
        .parse::<i64>()
        .map_err(|_| MigrationError::InvalidName { name: name.clone() })?;

    Ok(MigrationDescriptor {
        order,
        name,
        location: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "-- up\n\n-- down\n").unwrap();
    }

    #[test]
    fn test_descriptor_from_path() {
        let d = descriptor_from_path(Path::new("migrations/10-create_users.sql")).unwrap();
        assert_eq!(d.order, 10);
        assert_eq!(d.name, "10-create_users");
        assert_eq!(d.location, PathBuf::from("migrations/10-create_users.sql"));
    }

    #[test]
    fn test_descriptor_rejects_missing_order_key() {
        let err = descriptor_from_path(Path::new("migrations/create_users.sql")).unwrap_err();
        match err {
            MigrationError::InvalidName { name } => assert_eq!(name, "create_users"),
            other => panic!("expected InvalidName, got {:?}", other),
        }
    }

    #[test]
    fn test_descriptor_rejects_overflowing_order_key() {
        let err =
            descriptor_from_path(Path::new("99999999999999999999-too_big.sql")).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidName { .. }));
    }

    #[test]
    fn test_scan_aggregates_across_roots() {
        let p1 = TempDir::new().unwrap();
        let p2 = TempDir::new().unwrap();
        touch(p1.path(), "10-create_users.sql");
        touch(p1.path(), "30-add_index.sql");
        touch(p2.path(), "20-add_email.sql");

        let found = scan(&[p1.path().to_path_buf(), p2.path().to_path_buf()]).unwrap();
        assert_eq!(found.len(), 3);

        let mut names: Vec<_> = found.iter().map(|d| d.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["10-create_users", "20-add_email", "30-add_index"]);
    }

    #[test]
    fn test_scan_ignores_non_sql_and_subdirectories() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "10-real.sql");
        fs::write(root.path().join("notes.txt"), "not a migration").unwrap();
        fs::create_dir(root.path().join("nested")).unwrap();
        touch(&root.path().join("nested"), "20-hidden.sql");

        let found = scan(&[root.path().to_path_buf()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "10-real");
    }

    #[test]
    fn test_scan_fails_hard_on_invalid_name() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "10-fine.sql");
        touch(root.path(), "broken.sql");

        let err = scan(&[root.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidName { .. }));
    }

    #[test]
    fn test_scan_missing_root_contributes_nothing() {
        let found = scan(&[PathBuf::from("/no/such/directory")]).unwrap();
        assert!(found.is_empty());
    }
}
