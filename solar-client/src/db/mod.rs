pub mod electrical_queries;
pub mod project_queries;
pub mod schema;

use std::str::FromStr;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
    },
};

/// Where readings are stored: an embedded file or a database server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// A plain file path or a `sqlite:` URL.
    Sqlite(String),
    /// A `postgres://` / `postgresql://` URL.
    Postgres(String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("no storage driver for '{scheme}://' (supported: sqlite, postgres)")]
pub struct UnsupportedStorage {
    pub scheme: String,
}

impl StorageTarget {
    /// Pick a backend from a storage location.
    ///
    /// Anything without a `scheme://` prefix is treated as a SQLite file path.
    pub fn parse(location: &str) -> Result<Self, UnsupportedStorage> {
        let location = location.trim();

        if let Some((scheme, _)) = location.split_once("://") {
            return match scheme.to_ascii_lowercase().as_str() {
                "postgres" | "postgresql" => Ok(Self::Postgres(location.to_string())),
                "sqlite" => Ok(Self::Sqlite(location.to_string())),
                other => Err(UnsupportedStorage {
                    scheme: other.to_string(),
                }),
            };
        }

        Ok(Self::Sqlite(location.to_string()))
    }
}

impl FromStr for StorageTarget {
    type Err = UnsupportedStorage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Open connection handle for either backend.
#[derive(Debug, Clone)]
pub enum Store {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl Store {
    pub async fn connect(target: &StorageTarget, max_connections: u32) -> Result<Self, sqlx::Error> {
        let max_connections = max_connections.max(1);

        match target {
            StorageTarget::Sqlite(location) => {
                let options = if location.starts_with("sqlite:") {
                    SqliteConnectOptions::from_str(location)?
                } else {
                    SqliteConnectOptions::new().filename(location)
                };
                let options = options
                    .create_if_missing(true)
                    .foreign_keys(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal);

                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect_with(options)
                    .await?;
                Ok(Self::Sqlite(pool))
            }
            StorageTarget::Postgres(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(max_connections)
                    .connect(url)
                    .await?;
                Ok(Self::Postgres(pool))
            }
        }
    }

    /// Close every pooled connection. Safe to call more than once.
    pub async fn close(&self) {
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Postgres(pool) => pool.close().await,
        }
    }
}
