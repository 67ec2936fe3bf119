use std::{env, path::Path, sync::Arc, time::Duration};

use libsql::{Builder, Connection, Database as LibSqlDatabase};
use thiserror::Error;

/// Shared handle to the rule store. Cheap to clone; every clone talks to the
/// same underlying libSQL database.
#[derive(Clone)]
pub struct Database {
    inner: Arc<LibSqlDatabase>,
}

/// How long a connection waits on another connection's write before failing.
/// Sessions read and write through separate connections to the same file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to open database: {0}")]
    Build(libsql::Error),
    #[error("failed to open connection: {0}")]
    Connect(libsql::Error),
    #[error("failed to execute statement: {0}")]
    Statement(libsql::Error),
    #[error("remote database requires LIBSQL_AUTH_TOKEN")]
    MissingAuthToken,
}

impl Database {
    pub async fn open(location: &Path) -> Result<Self, DbError> {
        let location = location.to_string_lossy().to_string();
        let inner = if is_remote(&location) {
            let auth_token = env::var("LIBSQL_AUTH_TOKEN")
                .ok()
                .filter(|token| !token.is_empty())
                .ok_or(DbError::MissingAuthToken)?;
            Builder::new_remote(location, auth_token).build().await
        } else {
            Builder::new_local(location).build().await
        }
        .map_err(DbError::Build)?;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// A connection with foreign keys enforced. Only the reference tables
    /// (data types, filters, applications, events, attributes, actions and
    /// parameters) declare them. Rule rows point at each other and at
    /// descriptors by plain ids, and stay consistent through the rule writer
    /// and deleter, so hand-written corrupt rows are still storable and are
    /// reported on load.
    pub async fn connection(&self) -> Result<Connection, DbError> {
        let conn = self.inner.connect().map_err(DbError::Connect)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(DbError::Connect)?;
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(DbError::Statement)?;
        Ok(conn)
    }

    pub async fn health_check(&self) -> Result<(), DbError> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query("SELECT 1", ())
            .await
            .map_err(DbError::Statement)?;
        rows.next().await.map_err(DbError::Statement)?;
        Ok(())
    }
}

fn is_remote(location: &str) -> bool {
    ["libsql://", "http://", "https://"]
        .iter()
        .any(|scheme| location.starts_with(scheme))
}
