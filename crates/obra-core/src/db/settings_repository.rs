//! Settings repository implementation

use crate::error::Result;
use crate::settings::AppSettings;
use libsql::Connection;

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Load settings, falling back to defaults for missing keys
    async fn load(&self) -> Result<AppSettings>;

    /// Persist the full settings object
    async fn save(&self, settings: &AppSettings) -> Result<()>;
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn load(&self) -> Result<AppSettings> {
        let logo = self.get_setting("logo").await?;

        let push_registered = self
            .get_setting("push_registered")
            .await?
            .is_some_and(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            });

        Ok(AppSettings {
            logo,
            push_registered,
        })
    }

    async fn save(&self, settings: &AppSettings) -> Result<()> {
        match &settings.logo {
            Some(logo) => self.set_setting("logo", logo).await?,
            None => self.clear_setting("logo").await?,
        }
        self.set_setting(
            "push_registered",
            if settings.push_registered { "true" } else { "false" },
        )
        .await?;
        Ok(())
    }
}

impl LibSqlSettingsRepository<'_> {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn clear_setting(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", [key])
            .await?;
        Ok(())
    }
}
