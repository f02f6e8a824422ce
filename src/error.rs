use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database open error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("no classification stored for {type_name}/{uuid}")]
    NoClassification { type_name: String, uuid: String },

    #[error("invalid classification: {0}")]
    InvalidClassification(String),

    #[error("{interface} implementation `{name}` is unavailable: {reason}")]
    UnknownImplementation {
        interface: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error(
        "missing configuration for `{implementation}`: {}",
        .missing.join(", ")
    )]
    MissingConfiguration {
        implementation: String,
        missing: Vec<String>,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("unsupported format version {version} in {}", .path.display())]
    UnsupportedFormat { path: PathBuf, version: u32 },
}

/// Failures raised while building a registry from plugin sources.
///
/// Kept separate from [`Error`] so the outcome of discovery can be cached and
/// handed to every caller that races on first use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error(
        "duplicate {interface} implementation `{name}` in sources \
         `{first}` and `{second}`"
    )]
    DuplicateImplementation {
        interface: &'static str,
        name: String,
        first: String,
        second: String,
    },

    #[error("source `{source_name}` exports `{name}` but does not define it")]
    MissingExport { source_name: String, name: String },
}
