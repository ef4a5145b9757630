// bridge-server/src/resolver.rs
//! Maps a human-facing user id (roll number, staff id) to sign-in details.
//!
//! Lookups run through an ordered list of strategies. The index collection
//! is the supported path; the two field queries tolerate profiles written
//! before the index existed and can be dropped once those are backfilled.

use crate::directory::{is_addressable_id, DirectoryError, DirectoryRecord, DirectoryStore};
use common::models::ResolvedUser;
use std::sync::Arc;
use thiserror::Error;

pub const INDEX_COLLECTION: &str = "userIdIndex";
pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Missing userId")]
    EmptyId,

    #[error("No user found for userId {0}")]
    NotFound(String),

    #[error("User record for userId {0} has no email")]
    MissingEmail(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Document keyed by the user id itself
    Index { collection: &'static str },
    /// First document whose `field` equals the user id
    Field { collection: &'static str, field: &'static str },
}

impl LookupStrategy {
    pub async fn lookup(
        &self,
        store: &dyn DirectoryStore,
        user_id: &str,
    ) -> Result<Option<DirectoryRecord>, DirectoryError> {
        match *self {
            // Ids Firestore cannot key a document by are simply absent from the index
            Self::Index { .. } if !is_addressable_id(user_id) => Ok(None),
            Self::Index { collection } => store.get_document(collection, user_id).await,
            Self::Field { collection, field } => store.find_first(collection, field, user_id).await,
        }
    }

    /// Index entries without an email do not end the search
    fn requires_email(&self) -> bool {
        matches!(self, Self::Index { .. })
    }
}

impl std::fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index { collection } => write!(f, "{}/<id>", collection),
            Self::Field { collection, field } => write!(f, "{} where {} ==", collection, field),
        }
    }
}

/// Index first, then `users.userId`, then the legacy `users.id`
pub fn default_strategies() -> Vec<LookupStrategy> {
    vec![
        LookupStrategy::Index {
            collection: INDEX_COLLECTION,
        },
        LookupStrategy::Field {
            collection: USERS_COLLECTION,
            field: "userId",
        },
        LookupStrategy::Field {
            collection: USERS_COLLECTION,
            field: "id",
        },
    ]
}

pub struct UserIdResolver {
    store: Arc<dyn DirectoryStore>,
    strategies: Vec<LookupStrategy>,
}

impl UserIdResolver {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self::with_strategies(store, default_strategies())
    }

    pub fn with_strategies(store: Arc<dyn DirectoryStore>, strategies: Vec<LookupStrategy>) -> Self {
        Self { store, strategies }
    }

    pub async fn resolve(&self, raw_user_id: &str) -> Result<ResolvedUser, ResolveError> {
        let user_id = raw_user_id.trim();
        if user_id.is_empty() {
            return Err(ResolveError::EmptyId);
        }

        let mut incomplete = false;
        for strategy in &self.strategies {
            let Some(record) = strategy.lookup(self.store.as_ref(), user_id).await? else {
                continue;
            };

            if record.field("email").is_some() {
                tracing::debug!(%strategy, "Resolved userId");
                return Ok(to_resolved_user(user_id, &record));
            }

            tracing::warn!(%strategy, record = %record.id, "Directory record has no email");
            if !strategy.requires_email() {
                return Err(ResolveError::MissingEmail(user_id.to_string()));
            }
            incomplete = true;
        }

        if incomplete {
            Err(ResolveError::MissingEmail(user_id.to_string()))
        } else {
            Err(ResolveError::NotFound(user_id.to_string()))
        }
    }
}

fn to_resolved_user(user_id: &str, record: &DirectoryRecord) -> ResolvedUser {
    ResolvedUser {
        email: record.field("email").unwrap_or_default().to_string(),
        // Index entries name the uid; profile documents are keyed by it
        uid: record.field("uid").unwrap_or(&record.id).to_string(),
        user_id: user_id.to_string(),
        user_name: record
            .field("userName")
            .or_else(|| record.field("name"))
            .map(str::to_string),
        role: record.field("role").map(str::to_string),
    }
}
