use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::DbError;

/// Logical database a connection is routed to.
///
/// Ordering follows declaration order, which is also the order of
/// [`DatabaseRole::ALL`] and of serialized status maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseRole {
    #[default]
    Primary,
    Cache,
    Queue,
    Cable,
}

impl DatabaseRole {
    pub const ALL: [DatabaseRole; 4] = [
        DatabaseRole::Primary,
        DatabaseRole::Cache,
        DatabaseRole::Queue,
        DatabaseRole::Cable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseRole::Primary => "primary",
            DatabaseRole::Cache => "cache",
            DatabaseRole::Queue => "queue",
            DatabaseRole::Cable => "cable",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DatabaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseRole {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatabaseRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| DbError::UnknownRole(s.to_string()))
    }
}

/// Framework component whose storage lives in a dedicated database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Application models.
    Application,
    /// Cache store entries.
    CacheStore,
    /// Background job queue.
    JobQueue,
    /// Pub/sub cable messages.
    Cable,
}

impl Component {
    pub fn role(self) -> DatabaseRole {
        match self {
            Component::Application => DatabaseRole::Primary,
            Component::CacheStore => DatabaseRole::Cache,
            Component::JobQueue => DatabaseRole::Queue,
            Component::Cable => DatabaseRole::Cable,
        }
    }
}
