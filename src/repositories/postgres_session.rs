use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::models::session::{MapPair, SessionRecord};
use crate::repositories::session::{SessionStore, StoreError};

/// Session storage backed by the `sessions` and `session_data` tables.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: Pool,
}

impl PostgresSessionStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn missing(column: &str) -> StoreError {
    StoreError::Backend(format!("missing column {column}"))
}

/// Maps a `sessions` row to a record without pairs.
fn row_to_record(row: &Row) -> Result<SessionRecord, StoreError> {
    Ok(SessionRecord {
        uuid: row.try_get("uuid").map_err(|_| missing("uuid"))?,
        expires: row.try_get("expires").map_err(|_| missing("expires"))?,
        last_access_time: row
            .try_get("last_access_time")
            .map_err(|_| missing("last_access_time"))?,
        data: Vec::new(),
    })
}

fn row_to_pair(row: &Row) -> Result<MapPair, StoreError> {
    Ok(MapPair {
        session_uuid: row.try_get("session_uuid").map_err(|_| missing("session_uuid"))?,
        key: row.try_get("key").map_err(|_| missing("key"))?,
        value: row.try_get("value").map_err(|_| missing("value"))?,
    })
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn get(&self, uuid: &str) -> Result<SessionRecord, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT uuid, expires, last_access_time
                FROM sessions
                WHERE uuid = $1
                "#,
                &[&uuid],
            )
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut record = row_to_record(&row)?;

        let rows = client
            .query(
                r#"
                SELECT session_uuid, key, value
                FROM session_data
                WHERE session_uuid = $1
                ORDER BY key
                "#,
                &[&uuid],
            )
            .await?;
        record.data = rows.iter().map(row_to_pair).collect::<Result<_, _>>()?;
        Ok(record)
    }

    async fn create(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        tx.execute(
            r#"
            INSERT INTO sessions (uuid, expires, last_access_time)
            VALUES ($1, $2, $3)
            "#,
            &[&record.uuid, &record.expires, &record.last_access_time],
        )
        .await?;
        insert_pairs(&tx, record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let updated = tx
            .execute(
                r#"
                UPDATE sessions
                SET expires = $2, last_access_time = $3
                WHERE uuid = $1
                "#,
                &[&record.uuid, &record.expires, &record.last_access_time],
            )
            .await?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        tx.execute(
            "DELETE FROM session_data WHERE session_uuid = $1",
            &[&record.uuid],
        )
        .await?;
        insert_pairs(&tx, record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, uuid: &str) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        // session_data rows go with the cascade
        let deleted = client
            .execute("DELETE FROM sessions WHERE uuid = $1", &[&uuid])
            .await?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM sessions WHERE expires < $1", &[&now])
            .await?;
        Ok(deleted)
    }
}

async fn insert_pairs(
    tx: &deadpool_postgres::Transaction<'_>,
    record: &SessionRecord,
) -> Result<(), StoreError> {
    if record.data.is_empty() {
        return Ok(());
    }
    let stmt = tx
        .prepare_cached(
            r#"
            INSERT INTO session_data (session_uuid, key, value)
            VALUES ($1, $2, $3)
            "#,
        )
        .await?;
    for pair in &record.data {
        tx.execute(&stmt, &[&record.uuid, &pair.key, &pair.value])
            .await?;
    }
    Ok(())
}
