//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;
use std::time::Duration;

use super::migrations;

/// Configuration for syncing the local replica with a remote database
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Remote database URL (e.g., `libsql://your-db.turso.io`)
    pub url: Option<String>,
    /// Authentication token for the remote database
    pub auth_token: Option<String>,
    /// Automatic pull interval; `None` disables background pulls
    pub sync_interval: Option<Duration>,
}

impl SyncConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            auth_token: Some(auth_token.into()),
            sync_interval: Some(Duration::from_secs(60)),
        }
    }

    /// Set the automatic pull interval
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Disable background pulls (explicit `Database::sync` calls only)
    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.sync_interval = None;
        self
    }

    pub const fn is_configured(&self) -> bool {
        self.url.is_some() && self.auth_token.is_some()
    }
}

/// Wrapper over a libSQL database.
///
/// The remote primary is the source of truth; both the local replica file
/// and anything derived from it are disposable, rebuildable caches.
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    sync_config: Option<SyncConfig>,
}

impl Database {
    /// Open a local-only database, creating the file if needed.
    ///
    /// Migrations run automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        let database = Self {
            db,
            conn,
            sync_config: None,
        };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open an in-memory database (used by tests)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let database = Self {
            db,
            conn,
            sync_config: None,
        };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open an embedded replica of a remote database.
    ///
    /// Reads are served from the local file; writes are forwarded to the
    /// remote primary and sync back. An initial pull runs before migrations
    /// so an existing remote schema is picked up first.
    pub async fn open_with_sync(
        local_path: impl AsRef<Path>,
        sync_config: SyncConfig,
    ) -> Result<Self> {
        let path_str = local_path.as_ref().to_string_lossy().to_string();

        let url = sync_config
            .url
            .as_ref()
            .ok_or_else(|| crate::error::Error::InvalidInput("Sync URL is required".into()))?;
        let token = sync_config
            .auth_token
            .as_ref()
            .ok_or_else(|| crate::error::Error::InvalidInput("Auth token is required".into()))?;

        let mut builder = Builder::new_remote_replica(&path_str, url.clone(), token.clone());
        if let Some(interval) = sync_config.sync_interval {
            builder = builder.sync_interval(interval);
        }

        let db = builder.build().await?;
        let conn = db.connect()?;

        let database = Self {
            db,
            conn,
            sync_config: Some(sync_config),
        };

        database.sync().await?;
        database.configure().await?;
        database.migrate().await?;

        Ok(database)
    }

    async fn configure(&self) -> Result<()> {
        // WAL and cache pragmas may be rejected on remote replicas
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Pull changes from the remote database, when sync is configured.
    pub async fn sync(&self) -> Result<()> {
        if self.sync_config.is_some() {
            self.db.sync().await?;
            tracing::debug!("replica synced with remote");
        }
        Ok(())
    }

    pub const fn is_sync_enabled(&self) -> bool {
        self.sync_config.is_some()
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(!db.is_sync_enabled());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_creates_file_and_reopens() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("obra.db");

        let db = Database::open(&path).await.unwrap();
        drop(db);
        assert!(path.exists());

        // Reopening an already-migrated file must not fail
        Database::open(&path).await.unwrap();
    }

    #[test]
    fn test_sync_config_builders() {
        let config = SyncConfig::new("libsql://obra.turso.io", "token").without_auto_sync();
        assert!(config.is_configured());
        assert!(config.sync_interval.is_none());

        let config = SyncConfig::default();
        assert!(!config.is_configured());
    }
}
