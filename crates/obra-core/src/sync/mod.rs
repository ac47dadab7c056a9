//! Live collection mirroring with CRUD entry points.
//!
//! A [`Synchronizer`] keeps an in-memory list of one collection's records
//! continuously consistent with the store and publishes it through a watch
//! channel. Writers never touch the mirror directly: `add`/`update`/`remove`
//! write to the store, and the mirror catches up when the subscription task
//! processes the change. On every refresh the whole list is rebuilt from a
//! full collection read - a full replace can never drift from the store,
//! at O(collection size) per update, which is the right trade for the tens
//! to low thousands of records this system holds per collection.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::db::{Database, DocumentRepository, LibSqlDocumentRepository};
use crate::error::{Error, Result};
use crate::models::Document;

/// Database handle shared between synchronizers and their tasks
pub type SharedDatabase = Arc<Mutex<Database>>;

/// How often the subscription task pulls the replica for remote changes
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Subscription lifecycle of a mirrored collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Initial load has not completed yet
    Loading,
    /// Mirror reflects the latest snapshot
    Live,
    /// The subscription failed; no further updates until a new
    /// synchronizer is constructed
    Error,
}

/// Point-in-time state of a mirrored collection
#[derive(Debug, Clone)]
pub struct SyncView<T> {
    pub records: Vec<T>,
    pub phase: SyncPhase,
    pub error: Option<String>,
}

impl<T> SyncView<T> {
    fn loading() -> Self {
        Self {
            records: Vec::new(),
            phase: SyncPhase::Loading,
            error: None,
        }
    }

    fn live(records: Vec<T>) -> Self {
        Self {
            records,
            phase: SyncPhase::Live,
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            records: Vec::new(),
            phase: SyncPhase::Error,
            error: Some(message),
        }
    }

    pub const fn is_live(&self) -> bool {
        matches!(self.phase, SyncPhase::Live)
    }
}

/// How a new record's identifier is chosen.
///
/// The caller states its intent explicitly; nothing is inferred from the
/// shape or length of the id itself.
#[derive(Debug, Clone)]
pub enum RecordInput<T> {
    /// The store assigns a fresh identifier; any id already on the record
    /// is replaced
    New(T),
    /// Upsert at the record's caller-assigned identifier (which may be as
    /// short as one character)
    WithId(T),
}

/// Live-mirroring CRUD facade over one remote collection.
///
/// One instance per collection; instances never share mirror state. Dropping
/// the synchronizer cancels the subscription task deterministically, so no
/// update can land after teardown.
pub struct Synchronizer<T: Document> {
    db: SharedDatabase,
    view: watch::Receiver<SyncView<T>>,
    refresh: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl<T: Document> Synchronizer<T> {
    /// Start mirroring `T::COLLECTION` with the default poll interval
    #[must_use]
    pub fn new(db: SharedDatabase) -> Self {
        Self::with_poll_interval(db, DEFAULT_POLL_INTERVAL)
    }

    /// Start mirroring with a custom replica poll interval
    #[must_use]
    pub fn with_poll_interval(db: SharedDatabase, poll_interval: Duration) -> Self {
        let (view_tx, view_rx) = watch::channel(SyncView::loading());
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(subscription_loop::<T>(
            Arc::clone(&db),
            view_tx,
            refresh_rx,
            poll_interval,
        ));

        Self {
            db,
            view: view_rx,
            refresh: refresh_tx,
            task,
        }
    }

    /// Subscribe to mirror updates. The receiver yields a fresh [`SyncView`]
    /// on every snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncView<T>> {
        self.view.clone()
    }

    /// Clone of the current mirror state
    #[must_use]
    pub fn view(&self) -> SyncView<T> {
        self.view.borrow().clone()
    }

    /// Create a record; returns its final identifier.
    ///
    /// The mirror is not updated synchronously - the new record appears
    /// when the subscription processes the write. Store errors propagate
    /// unchanged; there are no retries here.
    pub async fn add(&self, input: RecordInput<T>) -> Result<String> {
        let id = {
            let db = self.db.lock().await;
            let repo = LibSqlDocumentRepository::new(db.connection());
            match input {
                RecordInput::New(record) => {
                    repo.insert(T::COLLECTION, serde_json::to_value(&record)?)
                        .await?
                }
                RecordInput::WithId(record) => {
                    let id = record.id().to_string();
                    repo.upsert(T::COLLECTION, &id, serde_json::to_value(&record)?)
                        .await?;
                    id
                }
            }
        };
        self.nudge();
        Ok(id)
    }

    /// Shallow-merge `fields` into the record at `id`.
    ///
    /// Fails with [`Error::NotFound`] when no such record exists; the error
    /// surfaces to the caller rather than silently creating one.
    pub async fn update(&self, id: &str, fields: &Value) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = LibSqlDocumentRepository::new(db.connection());
            repo.patch(T::COLLECTION, id, fields).await?;
        }
        self.nudge();
        Ok(())
    }

    /// Delete the record at `id`. Removing an id that is already gone is
    /// success, so callers can treat remove as idempotent.
    pub async fn remove(&self, id: &str) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = LibSqlDocumentRepository::new(db.connection());
            repo.delete(T::COLLECTION, id).await?;
        }
        self.nudge();
        Ok(())
    }

    /// Cancel the subscription. The mirror stops updating immediately;
    /// the last published view stays readable.
    pub fn unsubscribe(&self) {
        self.task.abort();
    }

    fn nudge(&self) {
        // Only fails when the task is gone, which means we are unsubscribed
        let _ = self.refresh.send(());
    }
}

impl<T: Document> Drop for Synchronizer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Background task: rebuild the mirror on every refresh signal.
///
/// Signals are local write nudges and periodic replica pulls. Any failure
/// publishes [`SyncPhase::Error`] and ends the task - constructing a new
/// synchronizer is the recovery path.
async fn subscription_loop<T: Document>(
    db: SharedDatabase,
    view: watch::Sender<SyncView<T>>,
    mut refresh: mpsc::UnboundedReceiver<()>,
    poll_interval: Duration,
) {
    loop {
        match load_snapshot::<T>(&db).await {
            Ok(records) => {
                view.send_replace(SyncView::live(records));
            }
            Err(error) => {
                let error = Error::Subscription(error.to_string());
                tracing::warn!(collection = T::COLLECTION, %error, "mirror refresh failed");
                view.send_replace(SyncView::failed(error.to_string()));
                return;
            }
        }

        tokio::select! {
            signal = refresh.recv() => {
                if signal.is_none() {
                    // All write handles dropped; nothing left to mirror for
                    return;
                }
                // Collapse a burst of writes into one rebuild
                while refresh.try_recv().is_ok() {}
            }
            () = tokio::time::sleep(poll_interval) => {
                let pulled = { db.lock().await.sync().await };
                if let Err(error) = pulled {
                    let error = Error::Subscription(error.to_string());
                    tracing::warn!(collection = T::COLLECTION, %error, "replica pull failed");
                    view.send_replace(SyncView::failed(error.to_string()));
                    return;
                }
            }
        }
    }
}

/// Read the full collection and decode every record.
///
/// A record that no longer matches `T` fails the snapshot rather than being
/// dropped: a mirror that silently omits records would claim a consistency
/// it does not have.
async fn load_snapshot<T: Document>(db: &SharedDatabase) -> Result<Vec<T>> {
    let db = db.lock().await;
    let repo = LibSqlDocumentRepository::new(db.connection());
    let bodies = repo.list(T::COLLECTION).await?;

    bodies
        .into_iter()
        .map(|body| serde_json::from_value(body).map_err(Error::from))
        .collect()
}
