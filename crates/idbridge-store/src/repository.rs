//! SQLite implementation of IIdentityStore
//!
//! Concrete SQLite-based implementation of the identity-store port defined
//! in idbridge-core. Handles domain type serialization and SQL query
//! construction.
//!
//! ## Type Mapping
//!
//! | Domain Type      | SQL Type | Strategy                                   |
//! |------------------|----------|--------------------------------------------|
//! | LocalId          | INTEGER  | i64 via `.as_i64()` / `LocalId::new()`     |
//! | Email            | TEXT     | String via `.as_str()` / `Email::new()`    |
//! | RemoteObjectId   | TEXT     | String via `.as_str()` / `::new()`         |
//! | SyncStatus       | TEXT     | `as_str()` / `SyncStatus::parse()`         |
//! | bool             | INTEGER  | 0 / 1                                      |
//! | DateTime<Utc>    | TEXT     | ISO 8601 via `to_rfc3339()`                |

use anyhow::bail;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use idbridge_core::domain::{Email, IdentityRecord, LocalId, RemoteObjectId, SyncStatus};
use idbridge_core::ports::{FailureEntry, IIdentityStore};

use crate::StoreError;

/// SQLite-based implementation of the identity-store port
///
/// Provides persistent storage for identity records and the engine-owned
/// sync fields. All operations go through a connection pool; each write is
/// a single UPDATE so last-write-wins semantics hold per row.
pub struct SqliteIdentityStore {
    pool: SqlitePool,
}

impl SqliteIdentityStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

/// Reconstruct an IdentityRecord from a database row
fn record_from_row(row: &SqliteRow) -> Result<IdentityRecord, StoreError> {
    let id: i64 = row.get("id");
    let email_str: String = row.get("email");
    let first_name: String = row.get("first_name");
    let last_name: String = row.get("last_name");
    let job_title: Option<String> = row.get("job_title");
    let department: Option<String> = row.get("department");
    let active: i64 = row.get("active");
    let remote_object_id_str: Option<String> = row.get("remote_object_id");
    let sync_enabled: i64 = row.get("sync_enabled");
    let sync_status_str: String = row.get("sync_status");
    let last_error: Option<String> = row.get("last_error");
    let last_sync_str: Option<String> = row.get("last_sync");

    let email = Email::new(email_str)
        .map_err(|e| StoreError::Decode(format!("Invalid stored email: {e}")))?;

    let remote_object_id = remote_object_id_str
        .map(RemoteObjectId::new)
        .transpose()
        .map_err(|e| StoreError::Decode(format!("Invalid stored remote object ID: {e}")))?;

    let sync_status = SyncStatus::parse(&sync_status_str)
        .map_err(|e| StoreError::Decode(format!("Invalid stored sync status: {e}")))?;

    Ok(IdentityRecord {
        id: LocalId::new(id),
        email,
        first_name,
        last_name,
        job_title,
        department,
        active: active != 0,
        remote_object_id,
        sync_enabled: sync_enabled != 0,
        sync_status,
        last_error,
        last_sync: parse_optional_datetime(last_sync_str)?,
    })
}

// ============================================================================
// IIdentityStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IIdentityStore for SqliteIdentityStore {
    async fn get_record(&self, id: LocalId) -> anyhow::Result<Option<IdentityRecord>> {
        let row = sqlx::query("SELECT * FROM identity_records WHERE id = ?1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose().map_err(Into::into)
    }

    async fn upsert_record(&self, record: &IdentityRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO identity_records (
                id, email, first_name, last_name, job_title, department,
                active, remote_object_id, sync_enabled, sync_status,
                last_error, last_sync, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                job_title = excluded.job_title,
                department = excluded.department,
                active = excluded.active,
                remote_object_id = excluded.remote_object_id,
                sync_enabled = excluded.sync_enabled,
                sync_status = excluded.sync_status,
                last_error = excluded.last_error,
                last_sync = excluded.last_sync,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.id.as_i64())
        .bind(record.email.as_str())
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.job_title)
        .bind(&record.department)
        .bind(record.active as i64)
        .bind(record.remote_object_id.as_ref().map(|r| r.as_str().to_string()))
        .bind(record.sync_enabled as i64)
        .bind(record.sync_status.as_str())
        .bind(&record.last_error)
        .bind(record.last_sync.map(|t| t.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_in_progress(&self, id: LocalId) -> anyhow::Result<()> {
        // Conditional write doubles as a cross-process guard: disabled
        // records and already-running attempts are never admitted
        let result = sqlx::query(
            r#"
            UPDATE identity_records
            SET sync_status = 'in_progress', last_error = NULL, updated_at = ?1
            WHERE id = ?2 AND sync_status NOT IN ('disabled', 'in_progress')
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("record {id} is missing, disabled, or already has an attempt in progress");
        }
        Ok(())
    }

    async fn mark_synced(
        &self,
        id: LocalId,
        remote_id: Option<&RemoteObjectId>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE identity_records
            SET sync_status = 'synced',
                remote_object_id = COALESCE(?1, remote_object_id),
                last_error = NULL,
                last_sync = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(remote_id.map(|r| r.as_str().to_string()))
        .bind(at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, id: LocalId, error: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE identity_records
            SET sync_status = 'failed', last_error = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_status(&self, id: LocalId, status: SyncStatus) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE identity_records SET sync_status = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_remote_link(&self, id: LocalId, new_status: SyncStatus) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE identity_records
            SET remote_object_id = NULL,
                sync_status = ?1,
                last_error = NULL,
                last_sync = NULL,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(new_status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_sync_enabled(&self, id: LocalId, enabled: bool) -> anyhow::Result<()> {
        let status = if enabled {
            SyncStatus::Pending
        } else {
            SyncStatus::Disabled
        };

        sqlx::query(
            r#"
            UPDATE identity_records
            SET sync_enabled = ?1, sync_status = ?2, updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(enabled as i64)
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_status(&self, status: SyncStatus) -> anyhow::Result<Vec<LocalId>> {
        let rows =
            sqlx::query("SELECT id FROM identity_records WHERE sync_status = ?1 ORDER BY id")
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .iter()
            .map(|row| LocalId::new(row.get::<i64, _>("id")))
            .collect())
    }

    async fn list_by_status_older_than(
        &self,
        status: SyncStatus,
        older_than: DateTime<Utc>,
    ) -> anyhow::Result<Vec<LocalId>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM identity_records
            WHERE sync_status = ?1 AND updated_at < ?2
            ORDER BY id
            "#,
        )
        .bind(status.as_str())
        .bind(older_than.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LocalId::new(row.get::<i64, _>("id")))
            .collect())
    }

    async fn count_by_status(&self) -> anyhow::Result<HashMap<String, u64>> {
        let rows = sqlx::query(
            "SELECT sync_status, COUNT(*) AS n FROM identity_records GROUP BY sync_status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::new();
        for row in rows {
            let status: String = row.get("sync_status");
            let n: i64 = row.get("n");
            counts.insert(status, n as u64);
        }
        Ok(counts)
    }

    async fn recent_failures(&self, limit: u32) -> anyhow::Result<Vec<FailureEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, last_error, updated_at FROM identity_records
            WHERE sync_status = 'failed' AND last_error IS NOT NULL
            ORDER BY updated_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut failures = Vec::with_capacity(rows.len());
        for row in rows {
            let updated_at: String = row.get("updated_at");
            failures.push(FailureEntry {
                id: LocalId::new(row.get::<i64, _>("id")),
                email: row.get("email"),
                error: row.get::<Option<String>, _>("last_error").unwrap_or_default(),
                at: parse_datetime(&updated_at)?,
            });
        }
        Ok(failures)
    }
}
