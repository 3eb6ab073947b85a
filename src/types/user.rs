use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Author {
    pub login: String,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: Option<String>,
}
