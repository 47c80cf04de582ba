//! SQLite-backed registry store.
//!
//! One row per agent. The cached Agent Card is stored as JSON text and
//! replaced as a whole column value, so a record is always either the old or
//! the new version. Updates read and write inside one transaction.

use super::{AgentRecord, AgentRecordPatch, AgentRegistry, NewAgentRecord, RegistryError, Result};
use crate::vault::CredentialRef;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use uuid::Uuid;

const SELECT_COLUMNS: &str =
    "SELECT id, display_name, connection_url, credential_ref, agent_card, created_at, updated_at FROM agents";

#[derive(Debug, Clone)]
pub struct SqliteAgentStore {
    pool: SqlitePool,
}

impl SqliteAgentStore {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        // Every connection to `sqlite::memory:` is a separate database.
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA busy_timeout = 3000")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(url)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS agents (
                id             TEXT PRIMARY KEY,
                display_name   TEXT NOT NULL,
                connection_url TEXT NOT NULL,
                credential_ref TEXT,
                agent_card     TEXT NOT NULL,
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        tracing::debug!("Registry: SQLite schema ready");
        Ok(Self { pool })
    }
}

fn record_from_row(row: &SqliteRow) -> Result<AgentRecord> {
    let id: String = row.get("id");
    let corrupt = |reason: String| RegistryError::Corrupt {
        id: id.clone(),
        reason,
    };

    let card: String = row.get("agent_card");
    let credential_ref: Option<String> = row.get("credential_ref");
    Ok(AgentRecord {
        id: Uuid::parse_str(&id).map_err(|e| corrupt(e.to_string()))?,
        display_name: row.get("display_name"),
        connection_url: row.get("connection_url"),
        credential_ref: credential_ref.map(CredentialRef::new),
        agent_card: serde_json::from_str(&card)?,
        created_at: parse_timestamp(row.get("created_at")).map_err(&corrupt)?,
        updated_at: parse_timestamp(row.get("updated_at")).map_err(&corrupt)?,
    })
}

/// Fixed-width so text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: String) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp {raw:?}: {e}"))
}

#[async_trait]
impl AgentRegistry for SqliteAgentStore {
    async fn list(&self) -> Result<Vec<AgentRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at, rowid"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<AgentRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn create(&self, data: NewAgentRecord) -> Result<AgentRecord> {
        let record = AgentRecord::create(data, Utc::now());
        sqlx::query(
            "INSERT INTO agents
                (id, display_name, connection_url, credential_ref, agent_card, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(record.id.to_string())
        .bind(&record.display_name)
        .bind(&record.connection_url)
        .bind(record.credential_ref.as_ref().map(CredentialRef::as_str))
        .bind(serde_json::to_string(&record.agent_card)?)
        .bind(format_timestamp(&record.created_at))
        .bind(format_timestamp(&record.updated_at))
        .execute(&self.pool)
        .await?;

        tracing::info!(id = %record.id, name = %record.display_name, "Registry: agent created");
        Ok(record)
    }

    async fn update(&self, id: Uuid, patch: AgentRecordPatch) -> Result<Option<AgentRecord>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let next = record_from_row(&row)?.patched(patch, Utc::now())?;

        sqlx::query(
            "UPDATE agents
             SET display_name = ?2, connection_url = ?3, credential_ref = ?4,
                 agent_card = ?5, updated_at = ?6
             WHERE id = ?1",
        )
        .bind(id.to_string())
        .bind(&next.display_name)
        .bind(&next.connection_url)
        .bind(next.credential_ref.as_ref().map(CredentialRef::as_str))
        .bind(serde_json::to_string(&next.agent_card)?)
        .bind(format_timestamp(&next.updated_at))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(id = %id, "Registry: agent updated");
        Ok(Some(next))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM agents WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(id = %id, "Registry: agent deleted");
        }
        Ok(deleted)
    }
}
