//! A `deadpool`-managed pool of pooled, blocking `rusqlite` connections.

use std::path::PathBuf;

use deadpool::Runtime;

use crate::error::Error;

deadpool::managed_reexports!(
    "proposer-ledger",
    SqlitePoolManager,
    deadpool::managed::Object<SqlitePoolManager>,
    rusqlite::Error,
    Error
);

const RUNTIME: Runtime = Runtime::Tokio1;

pub struct SqlitePoolManager {
    database_path: PathBuf,
}

impl SqlitePoolManager {
    pub fn new(database_path: PathBuf) -> Self {
        Self { database_path }
    }

    fn new_connection(&self) -> rusqlite::Result<rusqlite::Connection> {
        let conn = rusqlite::Connection::open(&self.database_path)?;
        conn.execute("PRAGMA journal_mode = WAL;", ())?;
        conn.execute("PRAGMA foreign_keys = ON;", ())?;
        conn.execute("PRAGMA busy_timeout = 5000;", ())?;
        Ok(conn)
    }
}

impl deadpool::managed::Manager for SqlitePoolManager {
    type Type = deadpool_sync::SyncWrapper<rusqlite::Connection>;
    type Error = rusqlite::Error;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let conn = self.new_connection();
        deadpool_sync::SyncWrapper::new(RUNTIME, move || conn).await
    }

    async fn recycle(
        &self,
        _: &mut Self::Type,
        _: &deadpool::managed::Metrics,
    ) -> deadpool::managed::RecycleResult<Self::Error> {
        Ok(())
    }
}
