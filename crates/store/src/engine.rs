//! Generic CRUD and range queries over the local SQLite database
//!
//! Every operation acquires its own connection and releases it on every exit
//! path, so no connection outlives the call that opened it and nothing is
//! held across caller suspension points. Operations are transactional at
//! single-store granularity only; cross-store consistency is caller
//! discipline.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Row, Sqlite};

use crate::error::{Result, StoreError};
use crate::schema::{definition, ObjectStoreDefinition, OBJECT_STORES, SCHEMA_VERSION};

/// A value extracted from a record document for a secondary index column.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Null,
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::Text(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        IndexValue::Text(value)
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Integer(value)
    }
}

impl From<f64> for IndexValue {
    fn from(value: f64) -> Self {
        IndexValue::Real(value)
    }
}

/// Best-effort storage pressure probe. All zeros when the substrate cannot
/// report usage; this is advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StorageEstimate {
    pub used: u64,
    pub capacity: u64,
    pub ratio: f64,
}

/// Physical layout of one store as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub name: String,
    pub indexes: Vec<String>,
}

/// Handle to the local database. Cheap to clone; holds no open connection.
#[derive(Clone)]
pub struct StoreEngine {
    path: PathBuf,
    options: SqliteConnectOptions,
}

impl StoreEngine {
    /// Open (creating if absent) the database at `path` and apply the static
    /// store definitions.
    ///
    /// On first open or a `SCHEMA_VERSION` bump this walks [`OBJECT_STORES`]
    /// and creates any missing table, index column, or index. Existing
    /// structures are left untouched; the schema only ever grows.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let engine = Self { path, options };

        let mut conn = engine.connect().await?;
        let result = Self::upgrade(&mut conn).await;
        let _ = conn.close().await;
        result?;

        Ok(engine)
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch a single record by key. `None` when absent.
    pub async fn get<T: DeserializeOwned>(&self, store: &str, key: &str) -> Result<Option<T>> {
        let def = Self::require_store(store)?;
        let sql = format!(
            "SELECT record FROM \"{}\" WHERE \"{}\" = ?",
            def.name, def.key_path
        );

        let mut conn = self.connect().await?;
        let fetched = sqlx::query_scalar::<_, String>(&sql)
            .bind(key)
            .fetch_optional(&mut conn)
            .await;
        let _ = conn.close().await;

        match fetched? {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    /// Upsert a record keyed by the store's key path. Returns the key.
    pub async fn put<T: Serialize>(&self, store: &str, record: &T) -> Result<String> {
        let def = Self::require_store(store)?;
        let document = serde_json::to_value(record)?;
        let key = document
            .get(def.key_path)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| StoreError::MissingKey {
                store: def.name.to_string(),
                key_path: def.key_path.to_string(),
            })?;

        let mut sql = format!("INSERT INTO \"{}\" (\"{}\", record", def.name, def.key_path);
        for index in def.indexes {
            sql.push_str(&format!(", \"{index}\""));
        }
        sql.push_str(") VALUES (?, ?");
        for _ in def.indexes {
            sql.push_str(", ?");
        }
        sql.push_str(&format!(
            ") ON CONFLICT(\"{}\") DO UPDATE SET record = excluded.record",
            def.key_path
        ));
        for index in def.indexes {
            sql.push_str(&format!(", \"{index}\" = excluded.\"{index}\""));
        }

        let mut query = sqlx::query(&sql).bind(&key).bind(document.to_string());
        for index in def.indexes {
            query = bind_index_value(query, extract_index_value(&document, index));
        }

        let mut conn = self.connect().await?;
        let executed = query.execute(&mut conn).await;
        let _ = conn.close().await;
        executed?;

        Ok(key)
    }

    /// Delete a record by key. Deleting an absent key is not an error.
    pub async fn delete(&self, store: &str, key: &str) -> Result<()> {
        let def = Self::require_store(store)?;
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = ?",
            def.name, def.key_path
        );

        let mut conn = self.connect().await?;
        let executed = sqlx::query(&sql).bind(key).execute(&mut conn).await;
        let _ = conn.close().await;
        executed?;

        Ok(())
    }

    /// Unordered full-store read.
    pub async fn scan_all<T: DeserializeOwned>(&self, store: &str) -> Result<Vec<T>> {
        let def = Self::require_store(store)?;
        let sql = format!("SELECT record FROM \"{}\"", def.name);

        let mut conn = self.connect().await?;
        let fetched = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&mut conn)
            .await;
        let _ = conn.close().await;

        decode_documents(fetched?)
    }

    /// Equality lookup on a secondary index.
    pub async fn scan_by_index<T: DeserializeOwned>(
        &self,
        store: &str,
        index: &str,
        value: impl Into<IndexValue>,
    ) -> Result<Vec<T>> {
        let def = Self::require_store(store)?;
        Self::require_index(def, index)?;
        let sql = format!(
            "SELECT record FROM \"{}\" WHERE \"{index}\" = ?",
            def.name
        );

        let mut conn = self.connect().await?;
        let fetched = bind_index_value(sqlx::query(&sql), value.into())
            .fetch_all(&mut conn)
            .await;
        let _ = conn.close().await;

        let documents = fetched?
            .into_iter()
            .map(|row| row.try_get::<String, _>("record"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode_documents(documents)
    }

    /// Descending read on a secondary index, bounded by `limit`.
    ///
    /// This is the only ordered read path; the bound is pushed into the
    /// query so no more than `limit` records are ever materialized.
    pub async fn iterate_recent<T: DeserializeOwned>(
        &self,
        store: &str,
        index: &str,
        limit: usize,
    ) -> Result<Vec<T>> {
        let def = Self::require_store(store)?;
        Self::require_index(def, index)?;
        let sql = format!(
            "SELECT record FROM \"{}\" ORDER BY \"{index}\" DESC LIMIT ?",
            def.name
        );

        let mut conn = self.connect().await?;
        let fetched = sqlx::query_scalar::<_, String>(&sql)
            .bind(limit as i64)
            .fetch_all(&mut conn)
            .await;
        let _ = conn.close().await;

        decode_documents(fetched?)
    }

    /// Best-effort storage usage probe via SQLite page accounting.
    pub async fn estimate_usage(&self) -> StorageEstimate {
        self.read_usage().await.unwrap_or_default()
    }

    /// Whether storage use has crossed the given pressure threshold.
    /// Advisory, like the estimate it is built on.
    pub async fn is_near_quota(&self, threshold: f64) -> bool {
        self.estimate_usage().await.ratio >= threshold
    }

    /// Physical stores and their indexes as the database reports them.
    pub async fn database_info(&self) -> Result<Vec<StoreInfo>> {
        let mut conn = self.connect().await?;
        let result = Self::read_info(&mut conn).await;
        let _ = conn.close().await;
        result
    }

    /// Remove the database file (and SQLite sidecar files) from disk.
    /// Idempotent when the file is already gone.
    pub fn delete_database(&self) -> Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let mut os_path = self.path.clone().into_os_string();
            os_path.push(suffix);
            match std::fs::remove_file(PathBuf::from(os_path)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        SqliteConnection::connect_with(&self.options)
            .await
            .map_err(map_connect_error)
    }

    async fn upgrade(conn: &mut SqliteConnection) -> Result<()> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&mut *conn)
            .await
            .map_err(map_upgrade_error)?;

        if version >= i64::from(SCHEMA_VERSION) {
            return Ok(());
        }

        tracing::info!(
            from = version,
            to = SCHEMA_VERSION,
            "Upgrading object store schema"
        );

        for def in OBJECT_STORES {
            Self::apply_definition(conn, def).await?;
        }

        sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
            .execute(&mut *conn)
            .await
            .map_err(map_upgrade_error)?;

        Ok(())
    }

    async fn apply_definition(
        conn: &mut SqliteConnection,
        def: &ObjectStoreDefinition,
    ) -> Result<()> {
        let mut create = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\"{}\" TEXT PRIMARY KEY, record TEXT NOT NULL",
            def.name, def.key_path
        );
        for index in def.indexes {
            create.push_str(&format!(", \"{index}\""));
        }
        create.push(')');
        sqlx::query(&create)
            .execute(&mut *conn)
            .await
            .map_err(map_upgrade_error)?;

        // Index fields added to an existing store land as new columns.
        let existing = Self::existing_columns(conn, def.name).await?;
        for index in def.indexes {
            if !existing.iter().any(|column| column == index) {
                sqlx::query(&format!(
                    "ALTER TABLE \"{}\" ADD COLUMN \"{index}\"",
                    def.name
                ))
                .execute(&mut *conn)
                .await
                .map_err(map_upgrade_error)?;
            }
        }

        for index in def.indexes {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS \"idx_{}_{index}\" ON \"{}\" (\"{index}\")",
                def.name, def.name
            ))
            .execute(&mut *conn)
            .await
            .map_err(map_upgrade_error)?;
        }

        Ok(())
    }

    async fn existing_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(&format!("PRAGMA table_info(\"{table}\")"))
            .fetch_all(&mut *conn)
            .await
            .map_err(map_upgrade_error)?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("name").map_err(StoreError::from))
            .collect()
    }

    async fn read_info(conn: &mut SqliteConnection) -> Result<Vec<StoreInfo>> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut stores = Vec::with_capacity(tables.len());
        for table in tables {
            let rows = sqlx::query(&format!("PRAGMA index_list(\"{table}\")"))
                .fetch_all(&mut *conn)
                .await?;
            let mut indexes = Vec::new();
            for row in rows {
                let name: String = row.try_get("name")?;
                if !name.starts_with("sqlite_") {
                    indexes.push(name);
                }
            }
            indexes.sort();
            stores.push(StoreInfo {
                name: table,
                indexes,
            });
        }
        Ok(stores)
    }

    async fn read_usage(&self) -> Result<StorageEstimate> {
        let mut conn = self.connect().await?;
        let result = async {
            let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
                .fetch_one(&mut conn)
                .await?;
            let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
                .fetch_one(&mut conn)
                .await?;
            let max_page_count: i64 = sqlx::query_scalar("PRAGMA max_page_count")
                .fetch_one(&mut conn)
                .await?;
            Ok::<_, StoreError>((page_count, page_size, max_page_count))
        }
        .await;
        let _ = conn.close().await;

        let (page_count, page_size, max_page_count) = result?;
        let used = (page_count * page_size).max(0) as u64;
        let capacity = (max_page_count * page_size).max(0) as u64;
        let ratio = if capacity > 0 {
            used as f64 / capacity as f64
        } else {
            0.0
        };
        Ok(StorageEstimate {
            used,
            capacity,
            ratio,
        })
    }

    fn require_store(store: &str) -> Result<&'static ObjectStoreDefinition> {
        definition(store).ok_or_else(|| StoreError::UnknownStore(store.to_string()))
    }

    fn require_index(def: &ObjectStoreDefinition, index: &str) -> Result<()> {
        if def.indexes.contains(&index) {
            Ok(())
        } else {
            Err(StoreError::UnknownIndex {
                store: def.name.to_string(),
                index: index.to_string(),
            })
        }
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_index_value(query: SqliteQuery<'_>, value: IndexValue) -> SqliteQuery<'_> {
    match value {
        IndexValue::Text(s) => query.bind(s),
        IndexValue::Integer(i) => query.bind(i),
        IndexValue::Real(f) => query.bind(f),
        IndexValue::Null => query.bind(Option::<String>::None),
    }
}

/// Pull an index column value out of a record document. Strings, integers,
/// floats, and booleans index naturally; anything else (absent field, null,
/// nested structure) indexes as NULL.
fn extract_index_value(record: &serde_json::Value, field: &str) -> IndexValue {
    match record.get(field) {
        Some(serde_json::Value::String(s)) => IndexValue::Text(s.clone()),
        Some(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(i) => IndexValue::Integer(i),
            None => n.as_f64().map(IndexValue::Real).unwrap_or(IndexValue::Null),
        },
        Some(serde_json::Value::Bool(b)) => IndexValue::Integer(i64::from(*b)),
        _ => IndexValue::Null,
    }
}

fn decode_documents<T: DeserializeOwned>(documents: Vec<String>) -> Result<Vec<T>> {
    documents
        .into_iter()
        .map(|document| serde_json::from_str(&document).map_err(StoreError::from))
        .collect()
}

fn map_connect_error(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        // SQLITE_CANTOPEN
        if db.code().as_deref() == Some("14") || db.message().contains("unable to open") {
            return StoreError::Unavailable(db.message().to_string());
        }
    }
    match e {
        sqlx::Error::Io(io) => StoreError::Unavailable(io.to_string()),
        sqlx::Error::Configuration(msg) => StoreError::Unavailable(msg.to_string()),
        other => StoreError::Database(other),
    }
}

fn map_upgrade_error(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        // SQLITE_BUSY / SQLITE_LOCKED while another connection holds the file
        let code = db.code();
        let code = code.as_deref();
        if code == Some("5") || code == Some("6") || db.message().contains("database is locked") {
            return StoreError::Blocked;
        }
    }
    StoreError::Database(e)
}
