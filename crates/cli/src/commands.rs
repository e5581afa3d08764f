//! Command handlers: thin wrappers around the core runner that print a
//! human-readable status line per action.

use anyhow::Result;
use std::path::Path;
use tidemark_core::{create_migration, ApplyOutcome, MigrationRunner};

pub async fn apply_all(runner: &MigrationRunner) -> Result<()> {
    let report = runner.apply_all().await?;

    if report.applied_count == 0 {
        println!("Nothing to apply, ledger is up to date");
        return Ok(());
    }
    for name in &report.applied {
        println!("applied {}", name);
    }
    println!("Applied {} migration(s)", report.applied_count);
    Ok(())
}

pub async fn list(runner: &MigrationRunner, json: bool) -> Result<()> {
    let status = runner.status().await?;

    if json {
        let rows: Vec<_> = status
            .iter()
            .map(|(d, applied)| {
                serde_json::json!({
                    "order": d.order,
                    "name": d.name,
                    "location": d.location,
                    "applied": applied,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if status.is_empty() {
        println!("No migrations found");
        return Ok(());
    }
    for (descriptor, applied) in &status {
        let state = if *applied { "applied" } else { "pending" };
        println!("{:>8}  {}", state, descriptor.name);
    }
    Ok(())
}

pub async fn apply(runner: &MigrationRunner, path: &Path) -> Result<()> {
    match runner.apply_at(path).await? {
        ApplyOutcome::Applied => println!("applied {}", path.display()),
        ApplyOutcome::AlreadyApplied => {
            println!("{} is already applied, nothing to do", path.display())
        }
    }
    Ok(())
}

pub async fn revert(runner: &MigrationRunner, path: &Path) -> Result<()> {
    runner.revert_at(path).await?;
    println!("reverted {}", path.display());
    Ok(())
}

pub fn create(name: &str, directory: &Path) -> Result<()> {
    let path = create_migration(name, directory)?;
    println!("Created migration: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_writes_stub() {
        let dir = TempDir::new().unwrap();
        create("add users", dir.path()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("-add_users.sql"));
    }
}
