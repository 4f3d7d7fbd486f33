//! The record the smoke test writes

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Document};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub hobbies: Vec<String>,
}

impl Person {
    /// The fixed document inserted by the `insert` operation
    pub fn sample() -> Self {
        Self {
            id: None,
            name: "Steve".to_string(),
            hobbies: vec![
                "hiking".to_string(),
                "tennis".to_string(),
                "fly fishing".to_string(),
            ],
        }
    }

    /// The BSON document the driver sends for this person
    pub fn to_document(&self) -> Result<Document> {
        Ok(bson::to_document(self)?)
    }
}
