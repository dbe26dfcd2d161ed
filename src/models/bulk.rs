use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Action line preceding every document in a `_bulk` payload.
#[derive(Debug, Serialize)]
pub struct BulkAction<'a> {
    index: ActionMeta<'a>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: Option<&'a str>,
    #[serde(rename = "_id")]
    id: &'a str,
}

impl<'a> BulkAction<'a> {
    pub fn index(index: &'a str, doc_type: Option<&'a str>, id: &'a str) -> Self {
        Self {
            index: ActionMeta {
                index,
                doc_type,
                id,
            },
        }
    }
}

/// Query string of a `_bulk` request.
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone, Default)]
pub struct BulkQuery {
    pub refresh: Option<String>,
    pub pipeline: Option<String>,
}

/// Error object as returned by Elasticsearch, possibly wrapping a cause.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ErrorCause {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub caused_by: Option<Box<ErrorCause>>,
}

impl ErrorCause {
    pub fn new(kind: &str, reason: &str) -> Self {
        Self {
            kind: kind.to_string(),
            reason: Some(reason.to_string()),
            caused_by: None,
        }
    }

    pub fn caused_by(mut self, cause: ErrorCause) -> Self {
        self.caused_by = Some(Box::new(cause));
        self
    }

    /// Deepest non-empty reason in the cause chain.
    pub fn deepest_reason(&self) -> Option<&str> {
        let mut found = None;
        let mut current = Some(self);
        while let Some(cause) = current {
            if let Some(reason) = cause.reason.as_deref().filter(|r| !r.trim().is_empty()) {
                found = Some(reason);
            }
            current = cause.caused_by.as_deref();
        }
        found
    }
}

/// Body of a rejected request. Very old clusters send the error as a plain string.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Cause(ErrorCause),
    Message(String),
}

impl From<ErrorDetail> for ErrorCause {
    fn from(detail: ErrorDetail) -> Self {
        match detail {
            ErrorDetail::Cause(cause) => cause,
            ErrorDetail::Message(message) => ErrorCause {
                kind: String::default(),
                reason: Some(message),
                caused_by: None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    pub errors: bool,
    pub items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkItem {
    Index(BulkItemStatus),
    Create(BulkItemStatus),
    Update(BulkItemStatus),
    Delete(BulkItemStatus),
}

impl BulkItem {
    pub fn into_status(self) -> BulkItemStatus {
        match self {
            BulkItem::Index(status)
            | BulkItem::Create(status)
            | BulkItem::Update(status)
            | BulkItem::Delete(status) => status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkItemStatus {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorCause>,
}
