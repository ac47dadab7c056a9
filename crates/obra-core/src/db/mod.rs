//! Database layer for Obra

mod connection;
mod migrations;
mod repository;
mod settings_repository;

pub use connection::{Database, SyncConfig};
pub use repository::{DocumentRepository, LibSqlDocumentRepository};
pub use settings_repository::{LibSqlSettingsRepository, SettingsRepository};
