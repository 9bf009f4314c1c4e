use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

/// Open a SQLite pool tuned for the one-document-per-user workload.
///
/// Every write replaces a single row, so contention is brief; WAL plus a
/// busy timeout lets readers proceed while a save is in flight. The
/// database file is created on first use.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use super::connect_with_settings;

    #[tokio::test]
    async fn journal_mode_and_foreign_keys_are_applied() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");

        let (mode,): (String,) =
            sqlx::query_as("PRAGMA journal_mode").fetch_one(&pool).await.expect("journal_mode");
        // In-memory databases report `memory`; file-backed ones report `wal`.
        assert!(mode == "memory" || mode == "wal");

        let (fk,): (i64,) =
            sqlx::query_as("PRAGMA foreign_keys").fetch_one(&pool).await.expect("foreign_keys");
        assert_eq!(fk, 1);
    }

    #[tokio::test]
    async fn missing_database_file_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("repfuel.db");
        let url = format!("sqlite://{}", path.display());

        let pool = connect_with_settings(&url, 2, 5).await.expect("connect");
        sqlx::query("SELECT 1").execute(&pool).await.expect("ping");
        assert!(path.exists());
    }
}
