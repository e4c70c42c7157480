//! SQLite-backed document store
//!
//! All documents live in one `documents` table keyed by full path. Field
//! filters are evaluated with `json_extract` against the stored JSON.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{QueryBuilder, Row, SqlitePool};
use tracing::debug;
use ww_common::models::Fields;
use ww_common::paths::{CollectionPath, DocPath};
use ww_common::{Error, Result};

use super::{Document, DocumentStore, Filter};

#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Wrap a pool whose schema was created by `db::init_tables`
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Only plain identifiers may be used as filter or update fields
fn validate_field(field: &str) -> Result<()> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidInput(format!("Invalid field name: {:?}", field)));
    }
    Ok(())
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[Filter]) -> Result<()> {
    for filter in filters {
        validate_field(&filter.field)?;
        builder
            .push(" AND json_extract(data, ")
            .push_bind(format!("$.{}", filter.field))
            .push(")");

        match &filter.value {
            Value::Null => {
                builder.push(" IS NULL");
            }
            Value::String(s) => {
                builder.push(" = ").push_bind(s.clone());
            }
            Value::Bool(b) => {
                builder.push(" = ").push_bind(i64::from(*b));
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    builder.push(" = ").push_bind(i);
                } else if let Some(f) = n.as_f64() {
                    builder.push(" = ").push_bind(f);
                } else {
                    return Err(Error::InvalidInput(format!("Unsupported number: {}", n)));
                }
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(Error::InvalidInput(format!(
                    "Filter on '{}' must compare a scalar value",
                    filter.field
                )));
            }
        }
    }
    Ok(())
}

fn decode_row(row: &SqliteRow) -> Result<Document> {
    let path: String = row.try_get("path")?;
    let data: String = row.try_get("data")?;
    Ok(Document {
        path: path.parse()?,
        fields: serde_json::from_str(&data)?,
    })
}

impl SqliteDocumentStore {
    async fn fetch(&self, mut builder: QueryBuilder<'_, Sqlite>) -> Result<Vec<Document>> {
        builder.push(" ORDER BY created_at, rowid");
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn set(&self, path: &DocPath, fields: Fields) -> Result<()> {
        let now = timestamp();
        let data = serde_json::to_string(&fields)?;

        sqlx::query(
            r#"
            INSERT INTO documents (path, collection_path, collection_id, doc_id, data, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
        )
        .bind(path.to_string())
        .bind(path.collection().to_string())
        .bind(path.collection().collection_id())
        .bind(path.id())
        .bind(data)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(path = %path, "Document written");
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<()> {
        // Single statement: the write lock is taken before the document is
        // read, so concurrent writers queue on busy_timeout.
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE documents SET updated_at = ");
        builder.push_bind(timestamp());
        if !fields.is_empty() {
            builder.push(", data = json_set(data");
            for (key, value) in &fields {
                validate_field(key)?;
                builder
                    .push(", ")
                    .push_bind(format!("$.{}", key))
                    .push(", json(")
                    .push_bind(serde_json::to_string(value)?)
                    .push(")");
            }
            builder.push(")");
        }
        builder.push(" WHERE path = ").push_bind(path.to_string());

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("document {}", path)));
        }

        debug!(path = %path, "Document updated");
        Ok(())
    }

    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT path, data FROM documents WHERE path = ?")
            .bind(path.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[Filter],
    ) -> Result<Vec<Document>> {
        let mut builder =
            QueryBuilder::new("SELECT path, data FROM documents WHERE collection_path = ");
        builder.push_bind(collection.to_string());
        push_filters(&mut builder, filters)?;
        self.fetch(builder).await
    }

    async fn collection_group(
        &self,
        collection_id: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>> {
        let mut builder =
            QueryBuilder::new("SELECT path, data FROM documents WHERE collection_id = ");
        builder.push_bind(collection_id.to_string());
        push_filters(&mut builder, filters)?;
        self.fetch(builder).await
    }
}
