use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The request data visible to pre-phase expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Request {
    pub method: String,
    pub path: String,

    /// Values captured by the endpoint's path template
    pub params: HashMap<String, String>,

    pub headers: HashMap<String, Vec<String>>,

    #[serde(alias = "querystring")]
    pub query: HashMap<String, Vec<String>>,
}

impl Request {
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }
}

/// The response data visible to post-phase expressions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Response {
    pub is_complete: bool,
    pub metadata: Metadata,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Response {
    /// A completed `200` response carrying `data`.
    #[must_use]
    pub fn new(data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            is_complete: true,
            metadata: Metadata {
                status_code: 200,
                headers: HashMap::new(),
            },
            data,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Metadata {
    pub status_code: u16,
    pub headers: HashMap<String, Vec<String>>,
}
