//! GraphQL documents and their variables.

use serde::Serialize;
use serde_json::Value;

use crate::types::{IssueState, StateFilter};

pub const LIST_ISSUES_QUERY: &str = r#"
query ListIssues(
    $owner: String!
    $name: String!
    $first: Int!
    $after: String
    $states: [IssueState!]
) {
    repository(owner: $owner, name: $name) {
        issues(
            first: $first
            after: $after
            states: $states
            orderBy: { field: UPDATED_AT, direction: DESC }
        ) {
            totalCount
            pageInfo {
                hasNextPage
                hasPreviousPage
                startCursor
                endCursor
            }
            nodes {
                id
                number
                title
                body
                state
                createdAt
                updatedAt
                author {
                    login
                    avatarUrl
                }
                labels(first: 10) {
                    nodes {
                        id
                        name
                        color
                    }
                }
                comments {
                    totalCount
                }
            }
        }
    }
}
"#;

pub const SEARCH_ISSUES_QUERY: &str = r#"
query SearchIssues($query: String!, $first: Int!, $after: String, $type: SearchType!) {
    search(query: $query, first: $first, after: $after, type: $type) {
        issueCount
        pageInfo {
            hasNextPage
            hasPreviousPage
            startCursor
            endCursor
        }
        nodes {
            ... on Issue {
                id
                number
                title
                body
                state
                createdAt
                updatedAt
                author {
                    login
                    avatarUrl
                }
                labels(first: 10) {
                    nodes {
                        id
                        name
                        color
                    }
                }
                comments {
                    totalCount
                }
            }
        }
    }
}
"#;

pub const GET_ISSUE_DETAIL_QUERY: &str = r#"
query GetIssueDetail(
    $owner: String!
    $name: String!
    $number: Int!
    $commentsFirst: Int!
    $commentsAfter: String
) {
    repository(owner: $owner, name: $name) {
        issue(number: $number) {
            id
            number
            title
            body
            bodyHTML
            state
            createdAt
            updatedAt
            closedAt
            author {
                login
                avatarUrl
            }
            labels(first: 10) {
                nodes {
                    id
                    name
                    color
                    description
                }
            }
            assignees(first: 10) {
                nodes {
                    login
                    avatarUrl
                }
            }
            reactions {
                totalCount
            }
            comments(first: $commentsFirst, after: $commentsAfter) {
                totalCount
                pageInfo {
                    hasNextPage
                    hasPreviousPage
                    startCursor
                    endCursor
                }
                nodes {
                    id
                    body
                    bodyHTML
                    createdAt
                    updatedAt
                    author {
                        login
                        avatarUrl
                    }
                }
            }
        }
    }
}
"#;

pub const LIST_COMMENTS_QUERY: &str = r#"
query ListComments($owner: String!, $name: String!, $number: Int!, $first: Int!, $after: String) {
    repository(owner: $owner, name: $name) {
        issue(number: $number) {
            number
            comments(first: $first, after: $after) {
                totalCount
                pageInfo {
                    hasNextPage
                    hasPreviousPage
                    startCursor
                    endCursor
                }
                nodes {
                    id
                    body
                    createdAt
                    updatedAt
                    author {
                        login
                        avatarUrl
                    }
                }
            }
        }
    }
}
"#;

/// Comments fetched together with an issue's detail.
pub const DETAIL_COMMENTS_PAGE_SIZE: u32 = 100;

/// Variables for the structured repository listing.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ListingVariables {
    pub owner: String,
    pub name: String,
    pub first: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<IssueState>>,
}

/// Variables for the full-text search endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchVariables {
    pub query: String,
    pub first: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(rename = "type")]
    pub search_type: &'static str,
}

/// One of the two request shapes the issue list can take.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueRequest {
    Listing(ListingVariables),
    Search(SearchVariables),
}

impl IssueRequest {
    pub fn document(&self) -> &'static str {
        match self {
            IssueRequest::Listing(_) => LIST_ISSUES_QUERY,
            IssueRequest::Search(_) => SEARCH_ISSUES_QUERY,
        }
    }

    pub fn variables(&self) -> Value {
        let result = match self {
            IssueRequest::Listing(vars) => serde_json::to_value(vars),
            IssueRequest::Search(vars) => serde_json::to_value(vars),
        };
        result.unwrap_or(Value::Null)
    }

    pub fn is_search(&self) -> bool {
        matches!(self, IssueRequest::Search(_))
    }
}

/// Build the GitHub search string for a free-text query.
pub fn search_query_string(owner: &str, name: &str, term: &str, state: StateFilter) -> String {
    let mut query = format!("repo:{owner}/{name} is:issue {}", term.trim());
    if let Some(qualifier) = state.qualifier() {
        query.push(' ');
        query.push_str(qualifier);
    }
    query
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IssueDetailVariables {
    pub owner: String,
    pub name: String,
    pub number: u64,
    #[serde(rename = "commentsFirst")]
    pub comments_first: u32,
    #[serde(rename = "commentsAfter", skip_serializing_if = "Option::is_none")]
    pub comments_after: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CommentsVariables {
    pub owner: String,
    pub name: String,
    pub number: u64,
    pub first: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}
