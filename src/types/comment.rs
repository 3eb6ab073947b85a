use serde::{Deserialize, Serialize};

use super::Author;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub body: String,
    #[serde(rename = "bodyHTML", default)]
    pub body_html: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
    pub author: Option<Author>,
}
