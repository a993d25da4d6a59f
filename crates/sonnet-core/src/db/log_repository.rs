//! libSQL implementation of the sync log sink

use libsql::{Connection, Row};

use crate::error::{Error, Result};
use crate::models::{SyncLog, SyncLogId};
use crate::store::SyncLogStore;

const COLUMNS: &str = "id, owner_id, started_at, duration, actions";

/// libSQL-backed `SyncLogStore`
#[derive(Clone)]
pub struct LibSqlSyncLogStore {
    conn: Connection,
}

impl LibSqlSyncLogStore {
    /// Create a store over the given connection
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Recent entries of `owner_id`, newest first
    pub async fn list_recent(&self, owner_id: &str, limit: usize) -> Result<Vec<SyncLog>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM sync_logs WHERE owner_id = ?
                     ORDER BY started_at DESC LIMIT ?"
                ),
                libsql::params![owner_id, limit],
            )
            .await?;

        let mut logs = Vec::new();
        while let Some(row) = rows.next().await? {
            logs.push(Self::parse_log(&row)?);
        }
        Ok(logs)
    }

    fn parse_log(row: &Row) -> Result<SyncLog> {
        let id: String = row.get(0)?;
        let actions: String = row.get(4)?;
        Ok(SyncLog {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("invalid sync log id in row: {id}")))?,
            owner_id: row.get(1)?,
            started_at: row.get(2)?,
            duration: row.get(3)?,
            actions: serde_json::from_str(&actions)?,
        })
    }
}

impl SyncLogStore for LibSqlSyncLogStore {
    async fn append(&self, log: &SyncLog) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO sync_logs ({COLUMNS}) VALUES (?, ?, ?, ?, ?)"),
                libsql::params![
                    log.id.as_str(),
                    log.owner_id.clone(),
                    log.started_at,
                    log.duration,
                    serde_json::to_string(&log.actions)?,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &SyncLogId) -> Result<Option<SyncLog>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {COLUMNS} FROM sync_logs WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_log(&row)?)),
            None => Ok(None),
        }
    }

    async fn latest(&self, owner_id: &str) -> Result<Option<SyncLog>> {
        Ok(self.list_recent(owner_id, 1).await?.into_iter().next())
    }

    async fn prune_older_than(&self, cutoff: i64) -> Result<u64> {
        let removed = self
            .conn
            .execute("DELETE FROM sync_logs WHERE started_at < ?", [cutoff])
            .await?;
        Ok(removed)
    }
}
