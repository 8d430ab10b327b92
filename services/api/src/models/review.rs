//! Review models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A reference to another document: either a bare id or the populated document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(String),
    Populated {
        #[serde(rename = "_id")]
        id: String,
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
}

impl Reference {
    pub fn id(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Populated { id, .. } => id,
        }
    }
}

/// Review record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: Reference,
    pub movie: Reference,
    pub rating: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Payload for `POST /review/user/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub user: String,
    pub movie: String,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Payload for `PATCH /review/user/:id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewUpdate {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none()
    }
}
