//! Obra CLI - manage business collections from the terminal
//!
//! Thin operational surface over obra-core: one-shot CRUD against the
//! document store, a live `watch` mode over the collection synchronizer,
//! and push registration management.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use obra_core::alarm::ReminderAlarm;
use obra_core::db::{
    Database, DocumentRepository, LibSqlDocumentRepository, LibSqlSettingsRepository,
    SettingsRepository, SyncConfig,
};
use obra_core::models::{
    CalendarEvent, Client, Document, Expense, Photo, ProfitDistribution, PushRegistration,
    SupplierInvoice,
};
use obra_core::sync::{SharedDatabase, SyncPhase, Synchronizer};
use obra_core::{deeplink, Error};
use serde_json::Value;
use thiserror::Error as ThisError;
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "obra")]
#[command(about = "Manage clients, expenses, invoices and reminders from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List a collection's records
    List {
        collection: Collection,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a record from a JSON body
    #[command(alias = "new")]
    Add {
        collection: Collection,
        /// Record body as a JSON object (without id unless --id is given)
        #[arg(long, value_name = "JSON")]
        json: String,
        /// Use this caller-assigned id instead of a generated one
        #[arg(long, value_name = "ID")]
        id: Option<String>,
    },
    /// Merge fields into an existing record
    Update {
        collection: Collection,
        id: String,
        /// Fields to merge, as a JSON object
        #[arg(long, value_name = "JSON")]
        json: String,
    },
    /// Delete a record
    Remove {
        collection: Collection,
        id: String,
    },
    /// Acknowledge a reminder (stops its notifications)
    Dismiss {
        /// Event id, or a pasted notification link containing ?eventId=...
        event: String,
    },
    /// Mirror a collection live, printing updates as they arrive
    Watch {
        #[arg(default_value = "events")]
        collection: Collection,
    },
    /// Sync the local replica with the remote database
    Sync,
    /// Show, set or clear the business logo
    Logo {
        /// New logo value (a data URL); omit to print the current one
        value: Option<String>,
        /// Remove the stored logo
        #[arg(long)]
        clear: bool,
    },
    /// Manage push notification registrations
    Push {
        #[command(subcommand)]
        command: PushCommands,
    },
}

#[derive(Subcommand)]
enum PushCommands {
    /// Register (or refresh) a push endpoint token
    Register {
        token: String,
        #[arg(long, default_value = "web")]
        platform: String,
    },
    /// List registered endpoints
    List,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum Collection {
    Events,
    Clients,
    Expenses,
    ProfitDistributions,
    Photos,
    SupplierInvoices,
    PushTokens,
}

impl Collection {
    const fn name(self) -> &'static str {
        match self {
            Self::Events => CalendarEvent::COLLECTION,
            Self::Clients => Client::COLLECTION,
            Self::Expenses => Expense::COLLECTION,
            Self::ProfitDistributions => ProfitDistribution::COLLECTION,
            Self::Photos => Photo::COLLECTION,
            Self::SupplierInvoices => SupplierInvoice::COLLECTION,
            Self::PushTokens => PushRegistration::COLLECTION,
        }
    }
}

#[derive(Debug, ThisError)]
enum CliError {
    #[error(transparent)]
    Core(#[from] Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid {collection} record: {message}")]
    InvalidRecord {
        collection: &'static str,
        message: String,
    },
    #[error(
        "Sync is not configured. Set TURSO_DATABASE_URL and TURSO_AUTH_TOKEN to enable `obra sync`."
    )]
    SyncNotConfigured,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("obra=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::List { collection, json } => run_list(collection, json, &db_path).await?,
        Commands::Add {
            collection,
            json,
            id,
        } => run_add(collection, &json, id, &db_path).await?,
        Commands::Update {
            collection,
            id,
            json,
        } => run_update(collection, &id, &json, &db_path).await?,
        Commands::Remove { collection, id } => run_remove(collection, &id, &db_path).await?,
        Commands::Dismiss { event } => run_dismiss(&event, &db_path).await?,
        Commands::Watch { collection } => run_watch(collection, &db_path).await?,
        Commands::Sync => run_sync(&db_path).await?,
        Commands::Logo { value, clear } => run_logo(value, clear, &db_path).await?,
        Commands::Push { command } => match command {
            PushCommands::Register { token, platform } => {
                run_push_register(&token, &platform, &db_path).await?;
            }
            PushCommands::List => run_push_list(&db_path).await?,
        },
    }

    Ok(())
}

fn resolve_db_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var("OBRA_DB_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("obra.db"))
}

fn sync_config_from_env() -> Option<SyncConfig> {
    let url = env::var("TURSO_DATABASE_URL").ok()?.trim().to_string();
    let auth_token = env::var("TURSO_AUTH_TOKEN").ok()?.trim().to_string();

    if url.is_empty() || auth_token.is_empty() {
        return None;
    }
    Some(SyncConfig::new(url, auth_token))
}

async fn open_database(db_path: &Path) -> Result<Database, CliError> {
    let db = if let Some(sync_config) = sync_config_from_env() {
        Database::open_with_sync(db_path, sync_config).await?
    } else {
        Database::open(db_path).await?
    };
    Ok(db)
}

async fn run_list(collection: Collection, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlDocumentRepository::new(db.connection());
    let records = repo.list(collection.name()).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            println!("{}", summary_line(record));
        }
    }
    Ok(())
}

async fn run_add(
    collection: Collection,
    raw: &str,
    id: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let mut body: Value = serde_json::from_str(raw)?;

    // Stamp the id first so the typed validation sees a complete record
    let id = id.unwrap_or_else(obra_core::models::fresh_id);
    if let Value::Object(map) = &mut body {
        map.insert("id".to_string(), Value::String(id.clone()));
    }
    validate_record(collection, &body)?;

    let db = open_database(db_path).await?;
    let repo = LibSqlDocumentRepository::new(db.connection());
    repo.upsert(collection.name(), &id, body).await?;

    println!("{id}");
    Ok(())
}

async fn run_update(
    collection: Collection,
    id: &str,
    raw: &str,
    db_path: &Path,
) -> Result<(), CliError> {
    let fields: Value = serde_json::from_str(raw)?;

    let db = open_database(db_path).await?;
    let repo = LibSqlDocumentRepository::new(db.connection());
    repo.patch(collection.name(), id, &fields).await?;

    println!("{id}");
    Ok(())
}

async fn run_remove(collection: Collection, id: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlDocumentRepository::new(db.connection());
    repo.delete(collection.name(), id).await?;

    println!("{id}");
    Ok(())
}

async fn run_dismiss(event: &str, db_path: &Path) -> Result<(), CliError> {
    // Accept either a bare id or a pasted notification deep link
    let id = deeplink::event_id(event).unwrap_or_else(|| event.to_string());

    let db = open_database(db_path).await?;
    let repo = LibSqlDocumentRepository::new(db.connection());
    repo.patch(
        CalendarEvent::COLLECTION,
        &id,
        &serde_json::json!({"dismissed": true}),
    )
    .await?;

    println!("{id}");
    Ok(())
}

async fn run_watch(collection: Collection, db_path: &Path) -> Result<(), CliError> {
    let db: SharedDatabase = Arc::new(Mutex::new(open_database(db_path).await?));

    match collection {
        Collection::Events => watch_events(db).await,
        Collection::Clients => watch_collection::<Client>(db).await,
        Collection::Expenses => watch_collection::<Expense>(db).await,
        Collection::ProfitDistributions => watch_collection::<ProfitDistribution>(db).await,
        Collection::Photos => watch_collection::<Photo>(db).await,
        Collection::SupplierInvoices => watch_collection::<SupplierInvoice>(db).await,
        Collection::PushTokens => watch_collection::<PushRegistration>(db).await,
    }
}

/// Print each mirror update until interrupted
async fn watch_collection<T: Document>(db: SharedDatabase) -> Result<(), CliError> {
    let sync = Synchronizer::<T>::with_poll_interval(db, Duration::from_secs(5));
    let mut rx = sync.subscribe();

    loop {
        if rx.changed().await.is_err() {
            break;
        }
        let view = rx.borrow().clone();
        match view.phase {
            SyncPhase::Live => {
                println!("{}: {} records", T::COLLECTION, view.records.len());
            }
            SyncPhase::Error => break,
            SyncPhase::Loading => {}
        }
    }

    let view = sync.view();
    Err(Error::Subscription(
        view.error
            .unwrap_or_else(|| "subscription ended".to_string()),
    )
    .into())
}

/// Events get the live mirror plus the in-app reminder alarm
async fn watch_events(db: SharedDatabase) -> Result<(), CliError> {
    let sync = Synchronizer::<CalendarEvent>::with_poll_interval(db, Duration::from_secs(5));
    let mut rx = sync.subscribe();
    let mut alarm = ReminderAlarm::new();
    // Same sweep cadence the web client used
    let mut ticker = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = rx.borrow().clone();
                match view.phase {
                    SyncPhase::Live => {
                        println!("events: {} records", view.records.len());
                    }
                    SyncPhase::Error => break,
                    SyncPhase::Loading => {}
                }
            }
            _ = ticker.tick() => {
                let view = rx.borrow().clone();
                for event in alarm.due(&view.records, chrono::Local::now().naive_local()) {
                    println!(
                        "REMINDER {} - {} at {}",
                        event.id,
                        event.title,
                        event.time.format("%H:%M")
                    );
                }
            }
        }
    }

    let view = sync.view();
    Err(Error::Subscription(
        view.error
            .unwrap_or_else(|| "subscription ended".to_string()),
    )
    .into())
}

async fn run_sync(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    if !db.is_sync_enabled() {
        return Err(CliError::SyncNotConfigured);
    }

    db.sync().await?;
    println!("Sync completed");
    Ok(())
}

async fn run_logo(value: Option<String>, clear: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlSettingsRepository::new(db.connection());
    let mut settings = repo.load().await?;

    if clear {
        settings.logo = None;
        repo.save(&settings).await?;
        println!("Logo cleared");
    } else if let Some(value) = value {
        settings.logo = Some(value);
        repo.save(&settings).await?;
        println!("Logo updated");
    } else {
        match settings.logo {
            Some(logo) => println!("{logo}"),
            None => println!("(no logo set)"),
        }
    }
    Ok(())
}

async fn run_push_register(token: &str, platform: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlDocumentRepository::new(db.connection());

    // Re-registering the same token refreshes it in place
    let user_agent = format!("obra-cli/{}", env!("CARGO_PKG_VERSION"));
    let registration = PushRegistration::new(token, platform, user_agent);
    repo.upsert(
        PushRegistration::COLLECTION,
        token,
        serde_json::to_value(&registration)?,
    )
    .await?;

    let settings_repo = LibSqlSettingsRepository::new(db.connection());
    let mut settings = settings_repo.load().await?;
    settings.push_registered = true;
    settings_repo.save(&settings).await?;

    println!("{token}");
    Ok(())
}

async fn run_push_list(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlDocumentRepository::new(db.connection());
    let records = repo.list(PushRegistration::COLLECTION).await?;

    for record in &records {
        let platform = record["platform"].as_str().unwrap_or("?");
        let token = record["token"].as_str().unwrap_or("?");
        println!("{platform}\t{token}");
    }
    Ok(())
}

/// Check a body against the collection's record type before writing it
fn validate_record(collection: Collection, body: &Value) -> Result<(), CliError> {
    fn check<T: Document>(body: &Value) -> Result<(), serde_json::Error> {
        serde_json::from_value::<T>(body.clone()).map(|_| ())
    }

    let result = match collection {
        Collection::Events => check::<CalendarEvent>(body),
        Collection::Clients => check::<Client>(body),
        Collection::Expenses => check::<Expense>(body),
        Collection::ProfitDistributions => check::<ProfitDistribution>(body),
        Collection::Photos => check::<Photo>(body),
        Collection::SupplierInvoices => check::<SupplierInvoice>(body),
        Collection::PushTokens => check::<PushRegistration>(body),
    };

    result.map_err(|error| CliError::InvalidRecord {
        collection: collection.name(),
        message: error.to_string(),
    })
}

/// One-line human summary of a stored record
fn summary_line(record: &Value) -> String {
    let id = record["id"].as_str().unwrap_or("?");
    let label = ["title", "name", "description", "provider", "period", "token", "url"]
        .iter()
        .find_map(|key| record[*key].as_str())
        .unwrap_or("");
    let date = record["date"].as_str().unwrap_or("");

    format!("{id}  {label}  {date}").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_validate_record_accepts_complete_event() {
        let body = json!({
            "id": "e1",
            "title": "Site visit",
            "date": "2024-03-01",
            "time": "09:00"
        });
        assert!(validate_record(Collection::Events, &body).is_ok());
    }

    #[test]
    fn test_validate_record_rejects_wrong_shape() {
        let body = json!({"id": "e1", "title": "Site visit"});
        let error = validate_record(Collection::Events, &body).unwrap_err();
        assert!(error.to_string().contains("events"));
    }

    #[test]
    fn test_summary_line_prefers_title() {
        let line = summary_line(&json!({
            "id": "e1",
            "title": "Site visit",
            "date": "2024-03-01"
        }));
        assert_eq!(line, "e1  Site visit  2024-03-01");
    }

    #[test]
    fn test_resolve_db_path_flag_wins() {
        let path = resolve_db_path(Some(PathBuf::from("/tmp/custom.db")));
        assert_eq!(path, PathBuf::from("/tmp/custom.db"));
    }
}
