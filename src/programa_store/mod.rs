mod models;
mod schema;
mod sqlite_programa_store;

pub use models::{MatrizEntry, Programa};
pub use schema::PROGRAMA_VERSIONED_SCHEMAS;
pub use sqlite_programa_store::SqliteProgramaStore;

use thiserror::Error;

/// Errors surfaced by a [`ProgramaStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("programa not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage(err.into())
    }
}

pub trait ProgramaStore: Send + Sync {
    /// Creates the programa or fully replaces it, matrizaria included.
    fn upsert(&self, programa: &Programa) -> Result<(), StoreError>;

    /// Returns the programa with its full matrizaria set, in insertion order.
    fn get(&self, codigo: &str) -> Result<Programa, StoreError>;

    /// Same replacement semantics as [`upsert`](Self::upsert), but fails with
    /// [`StoreError::NotFound`] when the codigo does not exist yet.
    fn update(&self, programa: &Programa) -> Result<(), StoreError>;

    /// Removes one programa and its matrizaria. Idempotent; returns the
    /// number of programas removed (0 or 1).
    fn delete(&self, codigo: &str) -> Result<usize, StoreError>;

    /// Removes every programa and every matrizaria row. Returns the number of
    /// programas removed.
    fn wipe(&self) -> Result<usize, StoreError>;
}
