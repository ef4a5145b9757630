// bridge-server/src/directory/mod.rs
//! Read-only access to the user directory kept in Firestore.

pub mod firestore;

use crate::google::CredentialsError;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub use firestore::FirestoreDirectory;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("directory request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("directory returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed directory response: {0}")]
    Malformed(String),
}

/// A document flattened to its scalar fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Document id within its collection
    pub id: String,
    pub fields: HashMap<String, String>,
}

impl DirectoryRecord {
    /// A field value, ignoring blanks
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Whether `id` can name a Firestore document.
///
/// `.` and `..` collapse in the request path, `/` would address a
/// subcollection and `__name__`-style ids are reserved.
pub fn is_addressable_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains('/')
        && !(id.len() >= 4 && id.starts_with("__") && id.ends_with("__"))
        && id.len() <= MAX_DOCUMENT_ID_BYTES
}

const MAX_DOCUMENT_ID_BYTES: usize = 1500;

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Fetch a document by id; `None` when it does not exist
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<DirectoryRecord>, DirectoryError>;

    /// First document of `collection` whose `field` equals `value`
    async fn find_first(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<DirectoryRecord>, DirectoryError>;
}
