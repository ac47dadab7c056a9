//! obra-core - Core library for Obra
//!
//! This crate contains the shared models, the document store, and the live
//! collection synchronizer used by all Obra surfaces (CLI, notifier).

pub mod alarm;
pub mod db;
pub mod deeplink;
pub mod error;
pub mod models;
pub mod settings;
pub mod sync;

pub use error::{Error, Result};
pub use models::Document;
pub use sync::{RecordInput, SyncPhase, SyncView, Synchronizer};
