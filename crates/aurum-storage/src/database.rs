// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. The `Database` struct IS the single writer; the dispatcher and
//! the webhook reconciler share it, which is what makes their racing
//! counter updates lost-update safe. Do NOT open additional connections
//! for writes.

use std::path::Path;

use aurum_core::AurumError;

use crate::migrations;

/// Handle to the SQLite database backing all campaign state.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, AurumError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| AurumError::Storage { source: Box::new(e) })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| AurumError::Storage { source: Box::new(e) })?;

        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        tracing::debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection. Query modules call through
    /// `connection().call(...)`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the connection, flushing the WAL.
    pub async fn close(self) -> Result<(), AurumError> {
        self.conn
            .close()
            .await
            .map_err(|e| AurumError::Storage { source: Box::new(e) })
    }
}

/// Map a tokio-rusqlite error into the crate error type.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> AurumError {
    AurumError::Storage { source: Box::new(e) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_runs_migrations_and_close() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // All five tables exist after migration.
        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('campaigns', 'campaign_runs', 'contacts', 'messages', 'webhook_events')",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<_, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 5);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();

        // Re-opening an already-migrated database must not fail.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }
}
