// bridge-server/src/directory/firestore.rs
use super::{DirectoryError, DirectoryRecord, DirectoryStore};
use crate::google::AccessTokenProvider;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<Document>,
}

impl From<Document> for DirectoryRecord {
    fn from(doc: Document) -> Self {
        let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
        let fields = doc
            .fields
            .iter()
            .filter_map(|(name, value)| scalar_value(value).map(|v| (name.clone(), v)))
            .collect();
        Self { id, fields }
    }
}

/// Render a typed Firestore value as plain text; maps and arrays are skipped
fn scalar_value(value: &Value) -> Option<String> {
    let (kind, inner) = value.as_object()?.iter().next()?;
    match (kind.as_str(), inner) {
        ("stringValue" | "timestampValue" | "referenceValue", Value::String(s)) => Some(s.clone()),
        // 64-bit integers travel as JSON strings
        ("integerValue", Value::String(s)) => Some(s.clone()),
        ("integerValue" | "doubleValue", Value::Number(n)) => Some(n.to_string()),
        ("booleanValue", Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// Firestore REST client scoped to one database
#[derive(Debug)]
pub struct FirestoreDirectory {
    base_url: Url,
    project_id: String,
    database: String,
    tokens: Arc<AccessTokenProvider>,
    http: reqwest::Client,
}

impl FirestoreDirectory {
    pub fn new(
        base_url: &str,
        project_id: impl Into<String>,
        database: impl Into<String>,
        tokens: Arc<AccessTokenProvider>,
        http: reqwest::Client,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            project_id: project_id.into(),
            database: database.into(),
            tokens,
            http,
        })
    }

    /// `<base>/projects/<p>/databases/<db>/<tail...>` with each segment escaped
    fn database_url(&self, tail: &[&str]) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::Malformed(format!("unusable Firestore base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(["projects", self.project_id.as_str(), "databases", self.database.as_str()])
            .extend(tail);
        Ok(url)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DirectoryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DirectoryStore for FirestoreDirectory {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<DirectoryRecord>, DirectoryError> {
        let url = self.database_url(&["documents", collection, id])?;
        let token = self.tokens.access_token().await?;

        let response = self.http.get(url).bearer_auth(token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let doc: Document = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| DirectoryError::Malformed(e.to_string()))?;
        Ok(Some(doc.into()))
    }

    async fn find_first(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<DirectoryRecord>, DirectoryError> {
        let url = self.database_url(&["documents:runQuery"])?;
        let token = self.tokens.access_token().await?;

        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": { "stringValue": value },
                    }
                },
                "limit": 1,
            }
        });

        let response = self.http.post(url).bearer_auth(token).json(&query).send().await?;
        let items: Vec<RunQueryItem> = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| DirectoryError::Malformed(e.to_string()))?;

        Ok(items
            .into_iter()
            .find_map(|item| item.document)
            .map(DirectoryRecord::from))
    }
}
