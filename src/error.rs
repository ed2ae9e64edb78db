//! Error types shared by the drill engine.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while obtaining the reference hand table. Both variants are fatal
/// to bootstrap; the front end offers a full reload.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("could not read hand table at {path}: {source}")]
    Fetch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bundled hand table is missing")]
    Bundled,
    #[error("hand table is missing the `{0}` column")]
    MissingColumn(&'static str),
    #[error("malformed hand table: {0}")]
    Parse(#[from] csv::Error),
}

/// Failures of the persistence medium itself.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A progress write that did not reach the medium. Logged, never fatal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistError {
    #[error("could not encode progress: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not write progress: {0}")]
    Storage(#[from] StorageError),
}
