use super::model::NewParticipant;
use crate::model::{Batch, Participant};
use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

/// Store-level failures, kept separate from wiring errors so callers can
/// react to the cases that matter: an unknown reference vs a violated
/// uniqueness or foreign-key constraint.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("integrity violation: {0}")]
    Integrity(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

fn map_db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.kind() {
            sqlx::error::ErrorKind::UniqueViolation => {
                return StoreError::Integrity(format!(
                    "unique constraint violated: {}",
                    db_err.message()
                ));
            }
            sqlx::error::ErrorKind::ForeignKeyViolation => {
                return StoreError::Integrity(format!(
                    "foreign key violated: {}",
                    db_err.message()
                ));
            }
            _ => {}
        }
    }
    StoreError::Db(err)
}

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let opts = SqliteConnectOptions::from_str(&normalized)?
        .create_if_missing(true)
        // The UNIQUE access-key and batch foreign-key invariants live in
        // the schema; the connection must actually enforce the latter.
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);
    let pool = SqlitePool::connect_with(opts).await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the
/// parent directory exists. Leaves in-memory URLs and non-sqlite schemes
/// untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let path = rest.trim_start_matches("//");
    if path.is_empty() {
        return url.to_string();
    }

    let expanded = match path.strip_prefix("~/") {
        Some(tail) => match std::env::var("HOME") {
            Ok(home) => format!("{}/{}", home.trim_end_matches('/'), tail),
            Err(_) => path.to_string(),
        },
        None => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    format!("sqlite://{}", expanded)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Allocate a new batch with a fresh opaque id and the current timestamp.
#[instrument(skip_all)]
pub async fn create_batch(pool: &Pool) -> Result<Batch, StoreError> {
    let mut tx = pool.begin().await?;
    let batch = create_batch_tx(&mut tx).await?;
    tx.commit().await?;
    Ok(batch)
}

pub async fn create_batch_tx(tx: &mut Transaction<'_, Sqlite>) -> Result<Batch, StoreError> {
    let batch = Batch {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
    };
    sqlx::query("INSERT INTO batches (id, created_at) VALUES (?, ?)")
        .bind(&batch.id)
        .bind(batch.created_at)
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
    Ok(batch)
}

/// Insert all rows atomically as a single transaction.
///
/// Fails with `StoreError::Integrity` if any access key collides with an
/// existing key or if `batch_id` does not reference an existing batch;
/// nothing is persisted in that case.
#[instrument(skip_all, fields(batch_id = %batch_id, rows = rows.len()))]
pub async fn add_participants(
    pool: &Pool,
    batch_id: &str,
    rows: &[NewParticipant],
) -> Result<usize, StoreError> {
    let mut tx = pool.begin().await?;
    for row in rows {
        insert_participant_tx(&mut tx, batch_id, &row.name, &row.contact_address, &row.access_key)
            .await?;
    }
    tx.commit().await?;
    Ok(rows.len())
}

pub async fn insert_participant_tx(
    tx: &mut Transaction<'_, Sqlite>,
    batch_id: &str,
    name: &str,
    contact_address: &str,
    access_key: &str,
) -> Result<i64, StoreError> {
    let rec = sqlx::query(
        "INSERT INTO participants (batch_id, name, contact_address, access_key, created_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(batch_id)
    .bind(name)
    .bind(contact_address)
    .bind(access_key)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await
    .map_err(map_db_err)?;
    Ok(rec.get::<i64, _>("id"))
}

/// List a batch's participants in insertion order.
///
/// An unknown batch id is `StoreError::NotFound`; a batch that exists but
/// has no participants yields an empty list. Callers that need to reject
/// empty batches (the dispatcher does) check the length themselves.
#[instrument(skip_all, fields(batch_id = %batch_id))]
pub async fn list_participants(pool: &Pool, batch_id: &str) -> Result<Vec<Participant>, StoreError> {
    if !batch_exists(pool, batch_id).await? {
        return Err(StoreError::NotFound(format!("batch {} not found", batch_id)));
    }

    let rows = sqlx::query(
        "SELECT id, batch_id, name, contact_address, access_key, created_at \
         FROM participants WHERE batch_id = ? ORDER BY id",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await
    .map_err(map_db_err)?;

    Ok(rows
        .into_iter()
        .map(|row| Participant {
            id: row.get("id"),
            batch_id: row.get("batch_id"),
            name: row.get("name"),
            contact_address: row.get("contact_address"),
            access_key: row.get("access_key"),
            created_at: row.get("created_at"),
        })
        .collect())
}

pub async fn batch_exists(pool: &Pool, batch_id: &str) -> Result<bool, StoreError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM batches WHERE id = ?")
        .bind(batch_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_err)?;
    Ok(found.is_some())
}

/// Full access-key set across all batches. The key generator consults this
/// snapshot; the UNIQUE constraint remains the source of truth at commit.
#[instrument(skip_all)]
pub async fn all_access_keys(pool: &Pool) -> Result<HashSet<String>, StoreError> {
    let keys = sqlx::query_scalar::<_, String>("SELECT access_key FROM participants")
        .fetch_all(pool)
        .await
        .map_err(map_db_err)?;
    Ok(keys.into_iter().collect())
}
