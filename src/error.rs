//! Crate-wide error type shared by every engine

use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the contact graph engines
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced document does not exist
    #[error("{0}")]
    NotFound(String),

    /// Input failed normalization or validation
    #[error("validation failure: {0}")]
    Validation(String),

    /// The document store reported a failure
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Standard message for a missing contact
    pub fn contact_not_found(id: &str) -> Self {
        Error::NotFound(format!("Contact {} not found", id))
    }
}
