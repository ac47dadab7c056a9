//! Generic document repository over the `documents` table

use crate::error::{Error, Result};
use crate::models::fresh_id;
use chrono::NaiveDate;
use libsql::{params, Connection};
use serde_json::{Map, Value};

/// Trait for document storage operations (async).
///
/// Documents are JSON objects addressed by `(collection, id)`. The stored
/// body always carries its own `id` field, kept equal to the document key,
/// so reads return complete records.
#[allow(async_fn_in_trait)]
pub trait DocumentRepository {
    /// Store a new document under a generated id; returns that id
    async fn insert(&self, collection: &str, body: Value) -> Result<String>;

    /// Store a document at a caller-assigned id, replacing any existing one
    async fn upsert(&self, collection: &str, id: &str, body: Value) -> Result<()>;

    /// Shallow-merge `fields` into an existing document.
    ///
    /// Top-level fields are inserted or replaced; replacing a nested object
    /// replaces it wholesale. Fails with [`Error::NotFound`] when `id` does
    /// not exist - a patch never creates a document.
    async fn patch(&self, collection: &str, id: &str, fields: &Value) -> Result<()>;

    /// Delete a document. Deleting a missing id is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Fetch one document by id
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Full collection scan, most recently written first
    async fn list(&self, collection: &str) -> Result<Vec<Value>>;

    /// Documents whose top-level `date` field equals the given calendar day
    async fn list_on_date(&self, collection: &str, date: NaiveDate) -> Result<Vec<Value>>;
}

/// libSQL implementation of `DocumentRepository`
pub struct LibSqlDocumentRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlDocumentRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn write(&self, collection: &str, id: &str, body: &Map<String, Value>) -> Result<()> {
        let serialized = serde_json::to_string(body)?;
        let now = chrono::Utc::now().timestamp_millis();

        self.conn
            .execute(
                "INSERT INTO documents (collection, id, body, updated_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT (collection, id)
                 DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![collection, id, serialized, now],
            )
            .await?;
        Ok(())
    }
}

impl DocumentRepository for LibSqlDocumentRepository<'_> {
    async fn insert(&self, collection: &str, body: Value) -> Result<String> {
        let id = fresh_id();
        let body = keyed_body(body, &id)?;
        self.write(collection, &id, &body).await?;
        Ok(id)
    }

    async fn upsert(&self, collection: &str, id: &str, body: Value) -> Result<()> {
        if id.is_empty() {
            return Err(Error::InvalidInput("Document id must not be empty".into()));
        }
        let body = keyed_body(body, id)?;
        self.write(collection, id, &body).await
    }

    async fn patch(&self, collection: &str, id: &str, fields: &Value) -> Result<()> {
        let Value::Object(fields) = fields else {
            return Err(Error::InvalidInput(
                "Patch must be a JSON object of fields".into(),
            ));
        };

        let current = self
            .get(collection, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{collection}/{id}")))?;

        let Value::Object(mut merged) = current else {
            return Err(Error::InvalidInput(format!(
                "Stored document {collection}/{id} is not an object"
            )));
        };
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
        // The document key is authoritative; a patched `id` field is discarded
        merged.insert("id".to_string(), Value::String(id.to_string()));

        self.write(collection, id, &merged).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM documents WHERE collection = ? AND id = ?",
                [collection, id],
            )
            .await?;
        // Zero affected rows means the id was already gone; callers treat
        // remove as idempotent, so that is success.
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let mut rows = self
            .conn
            .query(
                "SELECT body FROM documents WHERE collection = ? AND id = ?",
                [collection, id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let body: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let mut rows = self
            .conn
            .query(
                "SELECT body FROM documents
                 WHERE collection = ?
                 ORDER BY updated_at DESC, id ASC",
                [collection],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            let body: String = row.get(0)?;
            documents.push(serde_json::from_str(&body)?);
        }
        Ok(documents)
    }

    async fn list_on_date(&self, collection: &str, date: NaiveDate) -> Result<Vec<Value>> {
        let mut rows = self
            .conn
            .query(
                "SELECT body FROM documents
                 WHERE collection = ? AND json_extract(body, '$.date') = ?
                 ORDER BY updated_at DESC, id ASC",
                params![collection, date.to_string()],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            let body: String = row.get(0)?;
            documents.push(serde_json::from_str(&body)?);
        }
        Ok(documents)
    }
}

/// Validate that `body` is a JSON object and stamp the document key into it.
fn keyed_body(body: Value, id: &str) -> Result<Map<String, Value>> {
    let Value::Object(mut map) = body else {
        return Err(Error::InvalidInput(
            "Document body must be a JSON object".into(),
        ));
    };
    map.insert("id".to_string(), Value::String(id.to_string()));
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_assigns_id_and_stamps_body() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        let id = repo
            .insert("clients", json!({"name": "Ana"}))
            .await
            .unwrap();
        assert!(id.len() > 5);

        let stored = repo.get("clients", &id).await.unwrap().unwrap();
        assert_eq!(stored["id"], id.as_str());
        assert_eq!(stored["name"], "Ana");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_addressable_at_caller_id() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        // Short caller-assigned ids are honored as-is
        repo.upsert("events", "42", json!({"title": "visit"}))
            .await
            .unwrap();
        let stored = repo.get("events", "42").await.unwrap().unwrap();
        assert_eq!(stored["title"], "visit");

        // A second upsert at the same id replaces the body
        repo.upsert("events", "42", json!({"title": "moved"}))
            .await
            .unwrap();
        let stored = repo.get("events", "42").await.unwrap().unwrap();
        assert_eq!(stored["title"], "moved");
        assert_eq!(repo.list("events").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_patch_changes_only_named_fields() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        repo.upsert(
            "events",
            "e1",
            json!({"title": "visit", "dismissed": false, "time": "09:00"}),
        )
        .await
        .unwrap();

        repo.patch("events", "e1", &json!({"dismissed": true}))
            .await
            .unwrap();

        let stored = repo.get("events", "e1").await.unwrap().unwrap();
        assert_eq!(stored["dismissed"], true);
        assert_eq!(stored["title"], "visit");
        assert_eq!(stored["time"], "09:00");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_patch_replaces_nested_objects_wholesale() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        repo.upsert("docs", "d1", json!({"meta": {"a": 1, "b": 2}}))
            .await
            .unwrap();
        repo.patch("docs", "d1", &json!({"meta": {"c": 3}}))
            .await
            .unwrap();

        let stored = repo.get("docs", "d1").await.unwrap().unwrap();
        assert_eq!(stored["meta"], json!({"c": 3}));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_patch_missing_id_fails_without_creating() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        let result = repo.patch("events", "ghost", &json!({"dismissed": true})).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(repo.get("events", "ghost").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_patch_cannot_move_a_document() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        repo.upsert("events", "e1", json!({"title": "visit"}))
            .await
            .unwrap();
        repo.patch("events", "e1", &json!({"id": "e2"})).await.unwrap();

        let stored = repo.get("events", "e1").await.unwrap().unwrap();
        assert_eq!(stored["id"], "e1");
        assert!(repo.get("events", "e2").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_is_idempotent() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        repo.upsert("photos", "p1", json!({"url": "x"})).await.unwrap();
        repo.delete("photos", "p1").await.unwrap();
        assert!(repo.get("photos", "p1").await.unwrap().is_none());

        // Deleting again is still success
        repo.delete("photos", "p1").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_collections_are_isolated() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        repo.upsert("clients", "1", json!({"name": "Ana"})).await.unwrap();
        repo.upsert("expenses", "1", json!({"amount": 5.0})).await.unwrap();

        let clients = repo.list("clients").await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0]["name"], "Ana");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_on_date_filters() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        repo.upsert("events", "a", json!({"date": "2024-03-01", "title": "today"}))
            .await
            .unwrap();
        repo.upsert("events", "b", json!({"date": "2024-03-02", "title": "tomorrow"}))
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let todays = repo.list_on_date("events", date).await.unwrap();
        assert_eq!(todays.len(), 1);
        assert_eq!(todays[0]["title"], "today");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejects_non_object_bodies() {
        let db = setup().await;
        let repo = LibSqlDocumentRepository::new(db.connection());

        let result = repo.insert("clients", json!([1, 2, 3])).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
