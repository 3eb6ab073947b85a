use serde::{Deserialize, Serialize};

/// Pagination info for cursor-based pagination.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct PageInfo {
    #[serde(rename = "hasNextPage", default)]
    pub has_next_page: bool,
    #[serde(rename = "hasPreviousPage", default)]
    pub has_previous_page: bool,
    #[serde(rename = "startCursor", default)]
    pub start_cursor: Option<String>,
    #[serde(rename = "endCursor", default)]
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor for the following page, only when the server says one exists.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

/// A paginated list of nodes in server order.
///
/// The search API names its count `issueCount`; everything else uses
/// `totalCount`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Connection<T> {
    #[serde(rename = "totalCount", alias = "issueCount", default)]
    pub total_count: u64,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            total_count: 0,
            page_info: PageInfo::default(),
            nodes: Vec::new(),
        }
    }
}

/// Bare `{ nodes }` list without pagination.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Nodes<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

/// `{ totalCount }` only.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Count {
    #[serde(rename = "totalCount", default)]
    pub total_count: u64,
}
