//! Typed views of the payloads stored in the result cache.

use serde::{Deserialize, Serialize};

use crate::types::{Comment, Connection, Issue, IssueDetail};

/// `repository.issues` listing response.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ListingResponse {
    pub repository: Option<RepositoryIssues>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RepositoryIssues {
    pub issues: Connection<Issue>,
}

/// `search` response.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SearchResponse {
    pub search: Connection<Issue>,
}

/// Detail response, also the shape of the synthesized placeholder.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IssueDetailResponse {
    pub repository: Option<RepositoryIssue<IssueDetail>>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RepositoryIssue<T> {
    pub issue: Option<T>,
}

/// Comment feed response.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CommentsResponse {
    pub repository: Option<RepositoryIssue<IssueComments>>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IssueComments {
    pub number: u64,
    pub comments: Connection<Comment>,
}

impl ListingResponse {
    pub fn into_connection(self) -> Option<Connection<Issue>> {
        self.repository.map(|r| r.issues)
    }
}

impl IssueDetailResponse {
    pub fn into_issue(self) -> Option<IssueDetail> {
        self.repository.and_then(|r| r.issue)
    }
}

impl CommentsResponse {
    pub fn into_comments(self) -> Option<Connection<Comment>> {
        self.repository.and_then(|r| r.issue).map(|i| i.comments)
    }
}
