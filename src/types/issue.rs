use serde::{Deserialize, Serialize};

use super::{Author, Comment, Connection, Count, DetailLabel, IssueState, Label, Nodes};

/// Issue as it appears in listing and search results.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    pub author: Option<Author>,
    #[serde(default)]
    pub labels: Nodes<Label>,
    #[serde(default)]
    pub comments: Option<Count>,
}

/// Full issue as returned by the detail query.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IssueDetail {
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "bodyHTML", default)]
    pub body_html: String,
    pub state: IssueState,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "closedAt", default)]
    pub closed_at: Option<String>,
    pub author: Option<Author>,
    #[serde(default)]
    pub labels: Nodes<DetailLabel>,
    #[serde(default)]
    pub assignees: Nodes<Author>,
    #[serde(default)]
    pub comments: Connection<Comment>,
    #[serde(default)]
    pub reactions: Count,
}
