// common/src/models/user.rs
use serde::{Deserialize, Serialize};

/// Sign-in details for a human-facing user id, returned by `GET /resolve-userid`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedUser {
    pub email: String,
    /// Firebase uid
    pub uid: String,
    /// The id the caller looked up
    pub user_id: String,
    pub user_name: Option<String>,
    pub role: Option<String>,
}
