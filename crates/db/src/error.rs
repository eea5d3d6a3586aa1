use thiserror::Error;

use crate::role::DatabaseRole;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("unknown database role '{0}'; expected primary/cache/queue/cable")]
    UnknownRole(String),

    #[error("no database target configured for role '{0}'")]
    MissingTarget(DatabaseRole),

    #[error("database target for role '{0}' has no connection pool")]
    NoPool(DatabaseRole),

    #[error("invalid database target for role '{role}': {source}")]
    Configure {
        role: DatabaseRole,
        #[source]
        source: sqlx::Error,
    },
}

/// A liveness check against a physical database failed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConnectionFailure {
    pub message: String,
}

impl ConnectionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for ConnectionFailure {
    fn from(err: sqlx::Error) -> Self {
        Self::new(err.to_string())
    }
}
