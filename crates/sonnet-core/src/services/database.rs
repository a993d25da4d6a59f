//! Explicit local store handle shared by clients.

use std::path::{Path, PathBuf};

use crate::config::HousekeepingConfig;
use crate::db::{Database, LibSqlDocumentStore, LibSqlSyncLogStore};
use crate::sync::Housekeeping;
use crate::Result;

/// Open local database plus its background housekeeping.
///
/// Built once by the application and passed to whatever needs the stores.
/// Opening starts sync log pruning; [`LocalDatabase::close`] stops it.
pub struct LocalDatabase {
    db: Database,
    db_path: Option<PathBuf>,
    documents: LibSqlDocumentStore,
    logs: LibSqlSyncLogStore,
    housekeeping: Housekeeping,
}

impl LocalDatabase {
    /// Open (or create) the database at `db_path`.
    pub async fn open_path(
        db_path: impl Into<PathBuf>,
        housekeeping: HousekeepingConfig,
    ) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::info!("Opened local database at {}", db_path.display());
        Ok(Self::from_database(db, Some(db_path), housekeeping))
    }

    /// Open an in-memory database (primarily for tests).
    pub async fn open_in_memory(housekeeping: HousekeepingConfig) -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db, None, housekeeping))
    }

    fn from_database(db: Database, db_path: Option<PathBuf>, config: HousekeepingConfig) -> Self {
        let documents = LibSqlDocumentStore::new(db.connection().clone());
        let logs = LibSqlSyncLogStore::new(db.connection().clone());
        let housekeeping = Housekeeping::spawn(logs.clone(), config);
        Self {
            db,
            db_path,
            documents,
            logs,
            housekeeping,
        }
    }

    /// Handle to the document store; clones share the connection.
    pub fn documents(&self) -> LibSqlDocumentStore {
        self.documents.clone()
    }

    /// Handle to the sync log store; clones share the connection.
    pub fn logs(&self) -> LibSqlSyncLogStore {
        self.logs.clone()
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn is_housekeeping_running(&self) -> bool {
        self.housekeeping.is_running()
    }

    /// Stop housekeeping and release the database.
    pub async fn close(self) -> Result<()> {
        drop(self.housekeeping);
        drop(self.documents);
        drop(self.logs);
        self.db.close().await
    }
}
