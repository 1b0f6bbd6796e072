//! Schema migrations for kestrel storage backends
//!
//! A backend defines its schema as an ordered list of [`Migration`]s and
//! applies them through a [`MigrationManager`], which records each applied
//! version in a tracking table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

/// One reversible schema change.
#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Ordering key; must be unique within a backend
    fn version(&self) -> i64;

    fn name(&self) -> &str;
}

/// A row of the tracking table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix seconds
    pub applied_at: i64,
}

impl MigrationRecord {
    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.applied_at, 0)
    }
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_kestrel_migrations"
    }

    /// Create the tracking table if it does not exist
    async fn initialize(&self) -> Result<()>;

    /// Apply every migration not yet recorded, in version order
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Roll back recorded migrations, newest first
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    async fn is_applied(&self, version: i64) -> Result<bool>;

    /// Versions from `migrations` that have not been applied yet
    async fn pending(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<Vec<i64>> {
        let applied: Vec<i64> = self
            .get_applied_migrations()
            .await?
            .into_iter()
            .map(|record| record.version)
            .collect();

        let mut pending: Vec<i64> = migrations
            .iter()
            .map(|migration| migration.version())
            .filter(|version| !applied.contains(version))
            .collect();
        pending.sort_unstable();
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_applied_at() {
        let record = MigrationRecord {
            version: 1,
            name: "CreateUsers".to_string(),
            applied_at: 1_700_000_000,
        };
        assert_eq!(record.applied_at().unwrap().timestamp(), 1_700_000_000);
    }
}
