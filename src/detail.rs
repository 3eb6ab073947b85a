//! Issue detail with instant placeholder data, and the paged comment feed.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::ResultCache;
use crate::client::{request_fn, FetchExecutor};
use crate::config::Repository;
use crate::error::FetchError;
use crate::key::{keys, QueryKey};
use crate::merge::MergeArgs;
use crate::queries::{
    CommentsVariables, IssueDetailVariables, DETAIL_COMMENTS_PAGE_SIZE, GET_ISSUE_DETAIL_QUERY,
    LIST_COMMENTS_QUERY,
};
use crate::query::{QueryClient, QueryOptions, QueryState};
use crate::responses::{CommentsResponse, IssueDetailResponse, RepositoryIssue};
use crate::types::{
    Comment, Connection, Count, DetailLabel, Issue, IssueDetail, Nodes, PageInfo,
};

/// Where summary nodes live inside list and search payloads.
const SUMMARY_POINTERS: [&str; 2] = ["/repository/issues/nodes", "/search/nodes"];

/// Look through every cached list or search page for issue `number`.
pub fn find_cached_summary(cache: &ResultCache, number: u64) -> Option<Issue> {
    cache.find_map(|key, data| {
        SUMMARY_POINTERS
            .iter()
            .filter_map(|pointer| data.pointer(pointer).and_then(Value::as_array))
            .flatten()
            .find(|node| node.get("number").and_then(Value::as_u64) == Some(number))
            .and_then(|node| match Issue::deserialize(node) {
                Ok(issue) => Some(issue),
                Err(err) => {
                    tracing::debug!(%key, number, error = %err, "skipping malformed summary");
                    None
                }
            })
    })
}

/// Widen a list summary into a detail record good enough to render while
/// the real detail loads.
pub fn placeholder_detail(summary: &Issue) -> IssueDetail {
    IssueDetail {
        id: summary.id.clone(),
        number: summary.number,
        title: summary.title.clone(),
        body: summary.body.clone(),
        body_html: summary.body.clone().unwrap_or_default(),
        state: summary.state,
        created_at: summary.created_at.clone(),
        updated_at: summary.updated_at.clone(),
        closed_at: None,
        author: summary.author.clone(),
        labels: Nodes {
            nodes: summary.labels.nodes.iter().map(DetailLabel::from).collect(),
        },
        assignees: Nodes::default(),
        comments: Connection {
            total_count: summary.comments.map_or(0, |c| c.total_count),
            page_info: PageInfo::default(),
            nodes: Vec::new(),
        },
        reactions: Count::default(),
    }
}

fn placeholder_payload(detail: IssueDetail) -> Option<Value> {
    let response = IssueDetailResponse {
        repository: Some(RepositoryIssue {
            issue: Some(detail),
        }),
    };
    serde_json::to_value(response).ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssueDetailView {
    /// `None` until loaded, or when the issue does not exist.
    pub issue: Option<IssueDetail>,
    pub comments: Vec<Comment>,
    pub comments_page_info: PageInfo,
    pub comments_total: u64,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub error: Option<FetchError>,
    /// The issue shown is a placeholder built from a cached summary.
    pub is_showing_cached_data: bool,
}

pub struct IssueDetailQuery {
    client: QueryClient,
    executor: Arc<dyn FetchExecutor>,
    repo: Repository,
    number: u64,
    options: QueryOptions,
}

impl IssueDetailQuery {
    pub fn new(
        client: QueryClient,
        executor: Arc<dyn FetchExecutor>,
        repo: Repository,
        number: u64,
    ) -> Self {
        Self {
            client,
            executor,
            repo,
            number,
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn key(&self) -> QueryKey {
        keys::issue_detail(&self.repo.owner, &self.repo.name, self.number)
    }

    fn variables(&self) -> Value {
        let vars = IssueDetailVariables {
            owner: self.repo.owner.clone(),
            name: self.repo.name.clone(),
            number: self.number,
            comments_first: DETAIL_COMMENTS_PAGE_SIZE,
            comments_after: None,
        };
        serde_json::to_value(vars).unwrap_or(Value::Null)
    }

    fn query_options(&self) -> QueryOptions {
        let placeholder = find_cached_summary(self.client.cache(), self.number)
            .map(|summary| placeholder_detail(&summary))
            .and_then(placeholder_payload);
        self.options.clone().with_placeholder(placeholder)
    }

    /// Detail without waiting. Shows the cached summary as a placeholder
    /// while the real request is in flight.
    pub fn view(&self) -> IssueDetailView {
        let fetch = request_fn(Arc::clone(&self.executor), GET_ISSUE_DETAIL_QUERY, self.variables());
        let state = self.client.query(&self.key(), fetch, &self.query_options());
        build_detail_view(&state)
    }

    pub async fn load(&self) -> IssueDetailView {
        let fetch = request_fn(Arc::clone(&self.executor), GET_ISSUE_DETAIL_QUERY, self.variables());
        let state = self
            .client
            .fetch(&self.key(), fetch, &self.query_options())
            .await;
        build_detail_view(&state)
    }

    pub async fn refetch(&self) -> IssueDetailView {
        let fetch = request_fn(Arc::clone(&self.executor), GET_ISSUE_DETAIL_QUERY, self.variables());
        let state = self
            .client
            .refetch(&self.key(), fetch, &self.query_options())
            .await;
        build_detail_view(&state)
    }
}

fn build_detail_view(state: &QueryState) -> IssueDetailView {
    let (issue, decode_error) = match state.decode::<IssueDetailResponse>() {
        Ok(response) => (response.and_then(IssueDetailResponse::into_issue), None),
        Err(err) => (None, Some(err)),
    };
    let comments = issue
        .as_ref()
        .map(|i| i.comments.clone())
        .unwrap_or_default();

    IssueDetailView {
        comments_total: comments.total_count,
        comments_page_info: comments.page_info,
        comments: comments.nodes,
        is_showing_cached_data: state.is_placeholder && issue.is_some(),
        issue,
        is_loading: state.is_loading,
        is_fetching: state.is_fetching,
        error: state.error.clone().or(decode_error),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentFeedView {
    /// Every comment loaded so far, oldest first.
    pub comments: Vec<Comment>,
    pub total_count: u64,
    pub has_more: bool,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub error: Option<FetchError>,
}

/// An issue's comments, loaded page by page into one growing list.
pub struct CommentFeed {
    client: QueryClient,
    executor: Arc<dyn FetchExecutor>,
    repo: Repository,
    number: u64,
    page_size: u32,
    options: QueryOptions,
}

impl CommentFeed {
    pub fn new(
        client: QueryClient,
        executor: Arc<dyn FetchExecutor>,
        repo: Repository,
        number: u64,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            executor,
            repo,
            number,
            page_size,
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn key(&self) -> QueryKey {
        keys::issue_comments(&self.repo.owner, &self.repo.name, self.number)
    }

    fn page(&self, after: Option<String>) -> (Value, QueryOptions) {
        let vars = CommentsVariables {
            owner: self.repo.owner.clone(),
            name: self.repo.name.clone(),
            number: self.number,
            first: self.page_size,
            after: after.clone(),
        };
        let options = self.options.clone().with_merge_args(MergeArgs::after(after));
        (serde_json::to_value(vars).unwrap_or(Value::Null), options)
    }

    /// First page, or everything accumulated so far while it is fresh.
    pub async fn load(&self) -> CommentFeedView {
        let (variables, options) = self.page(None);
        let fetch = request_fn(Arc::clone(&self.executor), LIST_COMMENTS_QUERY, variables);
        let state = self.client.fetch(&self.key(), fetch, &options).await;
        build_feed_view(&state)
    }

    /// Append the next page. Returns the current feed untouched when the
    /// server reports no further pages.
    pub async fn load_more(&self) -> CommentFeedView {
        let current = self.client.state(&self.key(), &self.options);
        let cursor = decode_comments(&current)
            .ok()
            .flatten()
            .and_then(|conn| conn.page_info.next_cursor().map(str::to_string));
        let Some(cursor) = cursor else {
            return build_feed_view(&current);
        };

        tracing::debug!(number = self.number, %cursor, "loading more comments");
        let (variables, options) = self.page(Some(cursor));
        let fetch = request_fn(Arc::clone(&self.executor), LIST_COMMENTS_QUERY, variables);
        let state = self.client.refetch(&self.key(), fetch, &options).await;
        build_feed_view(&state)
    }
}

fn decode_comments(state: &QueryState) -> Result<Option<Connection<Comment>>, FetchError> {
    Ok(state
        .decode::<CommentsResponse>()?
        .and_then(CommentsResponse::into_comments))
}

fn build_feed_view(state: &QueryState) -> CommentFeedView {
    let (connection, decode_error) = match decode_comments(state) {
        Ok(conn) => (conn.unwrap_or_default(), None),
        Err(err) => (Connection::default(), Some(err)),
    };

    CommentFeedView {
        total_count: connection.total_count,
        has_more: connection.page_info.next_cursor().is_some(),
        comments: connection.nodes,
        is_loading: state.is_loading,
        is_fetching: state.is_fetching,
        error: state.error.clone().or(decode_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{issue_json, listing_payload, search_payload, ScriptedExecutor};
    use crate::types::{IssueState, StateFilter};
    use serde_json::json;
    use std::time::Duration;

    fn repo() -> Repository {
        Repository {
            owner: "octo".into(),
            name: "repo".into(),
        }
    }

    fn listing_with(nodes: Vec<Value>) -> Value {
        json!({
            "repository": {
                "issues": {
                    "totalCount": nodes.len(),
                    "pageInfo": { "hasNextPage": false, "hasPreviousPage": false },
                    "nodes": nodes,
                }
            }
        })
    }

    fn comment_json(id: &str) -> Value {
        json!({
            "id": id,
            "body": format!("comment {id}"),
            "createdAt": "2025-01-03T00:00:00Z",
            "author": { "login": "hubot" }
        })
    }

    fn detail_payload(number: u64) -> Value {
        json!({
            "repository": {
                "issue": {
                    "id": format!("I_{number}"),
                    "number": number,
                    "title": format!("Issue {number}"),
                    "body": "real body",
                    "bodyHTML": "<p>real body</p>",
                    "state": "CLOSED",
                    "createdAt": "2025-01-01T00:00:00Z",
                    "updatedAt": "2025-01-05T00:00:00Z",
                    "closedAt": "2025-01-05T00:00:00Z",
                    "author": { "login": "octocat" },
                    "labels": { "nodes": [] },
                    "assignees": { "nodes": [{ "login": "monalisa" }] },
                    "reactions": { "totalCount": 4 },
                    "comments": {
                        "totalCount": 3,
                        "pageInfo": { "hasNextPage": false, "hasPreviousPage": false },
                        "nodes": [comment_json("c1"), comment_json("c2"), comment_json("c3")]
                    }
                }
            }
        })
    }

    fn comments_payload(ids: &[&str], total: u64, next_cursor: Option<&str>) -> Value {
        json!({
            "repository": {
                "issue": {
                    "number": 7,
                    "comments": {
                        "totalCount": total,
                        "pageInfo": {
                            "hasNextPage": next_cursor.is_some(),
                            "hasPreviousPage": false,
                            "endCursor": next_cursor,
                        },
                        "nodes": ids.iter().map(|id| comment_json(id)).collect::<Vec<_>>(),
                    }
                }
            }
        })
    }

    fn client() -> QueryClient {
        QueryClient::new(ResultCache::default())
    }

    fn listing_key() -> QueryKey {
        keys::issues("octo", "repo", StateFilter::Open, "", None, 20)
    }

    #[test]
    fn test_finds_summary_in_listing_and_search_pages() {
        let cache = ResultCache::default();
        cache.put(&listing_key(), listing_payload(&[1, 2], 2, None), &MergeArgs::default());
        let search_key = keys::issues("octo", "repo", StateFilter::Open, "leak", None, 20);
        cache.put(&search_key, search_payload(&[9], 1, None), &MergeArgs::default());

        assert_eq!(find_cached_summary(&cache, 2).map(|i| i.number), Some(2));
        assert_eq!(find_cached_summary(&cache, 9).map(|i| i.number), Some(9));
        assert!(find_cached_summary(&cache, 3).is_none());
    }

    #[test]
    fn test_placeholder_detail_widens_summary() {
        let summary: Issue = serde_json::from_value(issue_json(7, 3)).unwrap();

        let detail = placeholder_detail(&summary);

        assert_eq!(detail.number, 7);
        assert_eq!(detail.title, "Issue 7");
        assert_eq!(detail.body_html, "Body of issue 7");
        assert_eq!(detail.closed_at, None);
        assert!(detail.assignees.nodes.is_empty());
        assert_eq!(detail.labels.nodes[0].name, "bug");
        assert_eq!(detail.labels.nodes[0].description, None);
        assert_eq!(detail.comments.total_count, 3);
        assert!(detail.comments.nodes.is_empty());
        assert!(!detail.comments.page_info.has_next_page);
        assert_eq!(detail.comments.page_info.end_cursor, None);
        assert_eq!(detail.reactions.total_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_shows_cached_summary_then_real_data() {
        let client = client();
        client.cache().put(
            &listing_key(),
            listing_with(vec![issue_json(6, 0), issue_json(7, 3)]),
            &MergeArgs::default(),
        );
        let executor = ScriptedExecutor::new();
        executor.push_ok_after(detail_payload(7), Duration::from_millis(100));
        let query = IssueDetailQuery::new(client.clone(), Arc::new(executor.clone()), repo(), 7);

        let view = query.view();

        assert!(view.is_showing_cached_data);
        assert!(view.is_loading);
        let issue = view.issue.unwrap();
        assert_eq!(issue.title, "Issue 7");
        assert_eq!(issue.state, IssueState::Open);
        assert_eq!(view.comments_total, 3);
        assert!(view.comments.is_empty());
        assert_eq!(client.cache().data(&query.key()), None);

        let loaded = query.load().await;

        assert!(!loaded.is_showing_cached_data);
        assert_eq!(loaded.issue.as_ref().map(|i| i.state), Some(IssueState::Closed));
        assert_eq!(loaded.comments.len(), 3);
        assert_eq!(executor.calls(), 1);
        assert_eq!(executor.last_variables().unwrap()["commentsFirst"], 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_without_cached_summary_loads_normally() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(detail_payload(42));
        let query = IssueDetailQuery::new(client(), Arc::new(executor.clone()), repo(), 42);

        let view = query.view();
        assert!(view.issue.is_none());
        assert!(view.is_loading);
        assert!(!view.is_showing_cached_data);

        let loaded = query.load().await;
        assert_eq!(loaded.issue.map(|i| i.number), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_issue_has_no_detail() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(json!({ "repository": { "issue": null } }));
        let query = IssueDetailQuery::new(client(), Arc::new(executor.clone()), repo(), 404);

        let view = query.load().await;

        assert!(view.issue.is_none());
        assert!(view.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_detail_drops_placeholder() {
        let client = client();
        client
            .cache()
            .put(&listing_key(), listing_with(vec![issue_json(7, 3)]), &MergeArgs::default());
        let executor = ScriptedExecutor::new();
        executor.push_err(FetchError::GraphQL {
            messages: vec!["boom".into()],
        });
        let query = IssueDetailQuery::new(client, Arc::new(executor.clone()), repo(), 7);

        let view = query.load().await;

        assert!(view.issue.is_none());
        assert!(matches!(view.error, Some(FetchError::GraphQL { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_comment_feed_accumulates_pages() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(comments_payload(&["c1", "c2"], 5, Some("k1")));
        executor.push_ok(comments_payload(&["c3", "c4"], 5, Some("k2")));
        executor.push_ok(comments_payload(&["c5"], 5, None));
        let feed = CommentFeed::new(client(), Arc::new(executor.clone()), repo(), 7, 2);

        let first = feed.load().await;
        assert_eq!(first.comments.len(), 2);
        assert!(first.has_more);

        let second = feed.load_more().await;
        assert_eq!(executor.last_variables().unwrap()["after"], "k1");
        assert_eq!(second.comments.len(), 4);

        let all = feed.load_more().await;
        let ids: Vec<_> = all.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4", "c5"]);
        assert_eq!(all.total_count, 5);
        assert!(!all.has_more);

        let unchanged = feed.load_more().await;
        assert_eq!(unchanged.comments.len(), 5);
        assert_eq!(executor.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_comment_feed_refresh_starts_over() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(comments_payload(&["c1"], 2, Some("k1")));
        executor.push_ok(comments_payload(&["c2"], 2, None));
        executor.push_ok(comments_payload(&["c1"], 2, Some("k1")));
        let client = client();
        let feed = CommentFeed::new(client.clone(), Arc::new(executor.clone()), repo(), 7, 1);

        feed.load().await;
        assert_eq!(feed.load_more().await.comments.len(), 2);

        client.invalidate(&keys::issue("octo", "repo", 7));
        let reloaded = feed.load().await;
        assert_eq!(reloaded.comments.len(), 1);
        assert!(reloaded.has_more);
    }
}
