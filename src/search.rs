//! Issue list state: filters, request shape and pagination.
//!
//! An empty search term lists the repository's issues ordered by last
//! update; any other term goes through the full-text search endpoint.
//! Backward paging replays a stack of cursors already visited, since the
//! search endpoint does not reliably report a usable `startCursor`.

use std::sync::Arc;

use crate::client::{request_fn, FetchExecutor};
use crate::config::Repository;
use crate::error::FetchError;
use crate::key::{keys, QueryKey};
use crate::merge::MergeArgs;
use crate::queries::{
    search_query_string, IssueRequest, ListingVariables, SearchVariables,
};
use crate::query::{QueryClient, QueryOptions, QueryState};
use crate::responses::{ListingResponse, SearchResponse};
use crate::types::{Connection, Issue, PageInfo, StateFilter};

#[derive(Debug, Clone, PartialEq)]
pub struct ListingFilters {
    pub search_term: String,
    pub state: StateFilter,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl ListingFilters {
    pub fn new(page_size: u32) -> Self {
        Self {
            search_term: String::new(),
            state: StateFilter::Open,
            page_size,
            cursor: None,
        }
    }

    pub fn has_search_term(&self) -> bool {
        !self.search_term.trim().is_empty()
    }
}

/// Everything the view layer needs to render one page of issues.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueListView {
    pub items: Vec<Issue>,
    pub total_count: u64,
    pub search_term: String,
    pub state: StateFilter,
    pub page_info: PageInfo,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    /// 1-based position in the visited page history.
    pub page_number: usize,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub error: Option<FetchError>,
}

pub struct IssueSearch {
    client: QueryClient,
    executor: Arc<dyn FetchExecutor>,
    repo: Repository,
    defaults: ListingFilters,
    filters: ListingFilters,
    max_page_size: u32,
    /// Cursors of every visited page, `None` for the first.
    history: Vec<Option<String>>,
    options: QueryOptions,
}

impl IssueSearch {
    pub fn new(
        client: QueryClient,
        executor: Arc<dyn FetchExecutor>,
        repo: Repository,
        defaults: ListingFilters,
        max_page_size: u32,
    ) -> Self {
        Self {
            client,
            executor,
            repo,
            filters: defaults.clone(),
            defaults,
            max_page_size: max_page_size.max(1),
            history: vec![None],
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn filters(&self) -> &ListingFilters {
        &self.filters
    }

    /// The request shape for the current filters.
    pub fn request(&self) -> IssueRequest {
        let filters = &self.filters;
        if filters.has_search_term() {
            IssueRequest::Search(SearchVariables {
                query: search_query_string(
                    &self.repo.owner,
                    &self.repo.name,
                    &filters.search_term,
                    filters.state,
                ),
                first: filters.page_size,
                after: filters.cursor.clone(),
                search_type: "ISSUE",
            })
        } else {
            IssueRequest::Listing(ListingVariables {
                owner: self.repo.owner.clone(),
                name: self.repo.name.clone(),
                first: filters.page_size,
                after: filters.cursor.clone(),
                states: filters.state.issue_state().map(|s| vec![s]),
            })
        }
    }

    pub fn key(&self) -> QueryKey {
        keys::issues(
            &self.repo.owner,
            &self.repo.name,
            self.filters.state,
            self.filters.search_term.trim(),
            self.filters.cursor.as_deref(),
            self.filters.page_size,
        )
    }

    fn query_options(&self) -> QueryOptions {
        self.options
            .clone()
            .with_merge_args(MergeArgs::after(self.filters.cursor.clone()))
    }

    /// Current page without waiting; starts a fetch when needed.
    pub fn view(&self) -> IssueListView {
        let request = self.request();
        let fetch = request_fn(
            Arc::clone(&self.executor),
            request.document(),
            request.variables(),
        );
        let state = self.client.query(&self.key(), fetch, &self.query_options());
        self.build_view(&request, &state)
    }

    /// Current page once any fetch for it has settled.
    pub async fn load(&self) -> IssueListView {
        let request = self.request();
        let fetch = request_fn(
            Arc::clone(&self.executor),
            request.document(),
            request.variables(),
        );
        let state = self
            .client
            .fetch(&self.key(), fetch, &self.query_options())
            .await;
        self.build_view(&request, &state)
    }

    /// Refetch the current page, ignoring freshness.
    pub async fn refresh(&self) -> IssueListView {
        let request = self.request();
        let fetch = request_fn(
            Arc::clone(&self.executor),
            request.document(),
            request.variables(),
        );
        let state = self
            .client
            .refetch(&self.key(), fetch, &self.query_options())
            .await;
        self.build_view(&request, &state)
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.reset_pagination();
        self.filters.search_term = term.into();
    }

    pub fn set_state_filter(&mut self, state: StateFilter) {
        self.reset_pagination();
        self.filters.state = state;
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.reset_pagination();
        self.filters.page_size = page_size.clamp(1, self.max_page_size);
    }

    /// Move to the next page if the current one reports it. Returns whether
    /// the cursor moved.
    pub fn load_next_page(&mut self) -> bool {
        let Some(cursor) = self.current_page_info().next_cursor().map(str::to_string) else {
            return false;
        };
        tracing::debug!(%cursor, "advancing to next page");
        self.history.push(Some(cursor.clone()));
        self.filters.cursor = Some(cursor);
        true
    }

    /// Step back to the previously visited page. Returns whether the cursor
    /// moved.
    pub fn load_previous_page(&mut self) -> bool {
        if self.history.len() <= 1 {
            return false;
        }
        self.history.pop();
        self.filters.cursor = self.history.last().cloned().flatten();
        true
    }

    pub fn reset_filters(&mut self) {
        self.history = vec![None];
        self.filters = self.defaults.clone();
    }

    pub fn has_previous_page(&self) -> bool {
        self.history.len() > 1
    }

    fn reset_pagination(&mut self) {
        self.history = vec![None];
        self.filters.cursor = None;
    }

    fn current_page_info(&self) -> PageInfo {
        let state = self.client.state(&self.key(), &self.options);
        decode_connection(&self.request(), &state)
            .ok()
            .flatten()
            .map(|conn| conn.page_info)
            .unwrap_or_default()
    }

    fn build_view(&self, request: &IssueRequest, state: &QueryState) -> IssueListView {
        let (connection, decode_error) = match decode_connection(request, state) {
            Ok(conn) => (conn, None),
            Err(err) => (None, Some(err)),
        };
        let connection = connection.unwrap_or_default();

        IssueListView {
            total_count: connection.total_count,
            has_next_page: connection.page_info.has_next_page,
            page_info: connection.page_info,
            items: connection.nodes,
            search_term: self.filters.search_term.clone(),
            state: self.filters.state,
            has_previous_page: self.has_previous_page(),
            page_number: self.history.len(),
            is_loading: state.is_loading,
            is_fetching: state.is_fetching,
            error: state.error.clone().or(decode_error),
        }
    }
}

fn decode_connection(
    request: &IssueRequest,
    state: &QueryState,
) -> Result<Option<Connection<Issue>>, FetchError> {
    if request.is_search() {
        Ok(state.decode::<SearchResponse>()?.map(|r| r.search))
    } else {
        Ok(state
            .decode::<ListingResponse>()?
            .and_then(ListingResponse::into_connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::queries::{LIST_ISSUES_QUERY, SEARCH_ISSUES_QUERY};
    use crate::test_support::{listing_payload, search_payload, ScriptedExecutor};
    use rstest::rstest;
    use serde_json::json;

    fn repo() -> Repository {
        Repository {
            owner: "octo".into(),
            name: "repo".into(),
        }
    }

    fn search_with(executor: &ScriptedExecutor) -> IssueSearch {
        IssueSearch::new(
            QueryClient::new(ResultCache::default()),
            Arc::new(executor.clone()),
            repo(),
            ListingFilters::new(20),
            100,
        )
    }

    fn numbers(range: std::ops::RangeInclusive<u64>) -> Vec<u64> {
        range.collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_search_uses_listing_shape() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(listing_payload(&numbers(1..=20), 42, Some("c1")));
        let search = search_with(&executor);

        let view = search.load().await;

        assert!(view.has_next_page);
        assert_eq!(view.items.len(), 20);
        assert_eq!(view.total_count, 42);
        assert!(!view.has_previous_page);
        assert_eq!(view.page_number, 1);

        let (document, variables) = executor.requests().remove(0);
        assert_eq!(document, LIST_ISSUES_QUERY);
        assert_eq!(
            variables,
            json!({ "owner": "octo", "name": "repo", "first": 20, "states": ["OPEN"] })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_search_uses_search_shape() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(search_payload(&[3, 9], 2, None));
        let mut search = search_with(&executor);
        search.set_search_term("crash");

        let view = search.load().await;

        assert_eq!(view.total_count, 2);
        assert_eq!(view.items.iter().map(|i| i.number).collect::<Vec<_>>(), vec![3, 9]);
        assert!(!view.has_next_page);

        let (document, variables) = executor.requests().remove(0);
        assert_eq!(document, SEARCH_ISSUES_QUERY);
        let query = variables["query"].as_str().unwrap();
        assert!(query.contains("is:issue"));
        assert!(query.contains("repo:octo/repo"));
        assert!(query.contains("crash"));
        assert!(query.ends_with("is:open"));
        assert_eq!(variables["type"], "ISSUE");
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_term_stays_on_listing() {
        let executor = ScriptedExecutor::new();
        let mut search = search_with(&executor);
        search.set_search_term("   ");
        assert!(!search.request().is_search());
    }

    #[rstest]
    #[case::search_term(|s: &mut IssueSearch| s.set_search_term("panic"))]
    #[case::state(|s: &mut IssueSearch| s.set_state_filter(StateFilter::Closed))]
    #[case::page_size(|s: &mut IssueSearch| s.set_page_size(50))]
    #[tokio::test(start_paused = true)]
    async fn test_filter_change_resets_pagination(#[case] change: fn(&mut IssueSearch)) {
        let executor = ScriptedExecutor::new();
        executor.push_ok(listing_payload(&numbers(1..=20), 60, Some("c1")));
        executor.push_ok(listing_payload(&numbers(21..=40), 60, Some("c2")));
        let mut search = search_with(&executor);

        search.load().await;
        assert!(search.load_next_page());
        search.load().await;
        assert!(search.load_next_page());
        assert_eq!(search.filters().cursor.as_deref(), Some("c2"));

        change(&mut search);

        assert_eq!(search.filters().cursor, None);
        assert!(!search.has_previous_page());
        assert!(!search.load_previous_page());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_absent_after_every_filter_call() {
        let executor = ScriptedExecutor::new();
        let mut search = search_with(&executor);
        let terms = ["a", "", "crash", " "];
        let states = [StateFilter::All, StateFilter::Closed, StateFilter::Open];

        for (i, term) in terms.iter().enumerate() {
            search.filters.cursor = Some(format!("c{i}"));
            search.set_search_term(*term);
            assert_eq!(search.filters().cursor, None);

            search.filters.cursor = Some(format!("s{i}"));
            search.set_state_filter(states[i % states.len()]);
            assert_eq!(search.filters().cursor, None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_page_requires_has_next_page() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(listing_payload(&[1, 2], 2, None));
        let mut search = search_with(&executor);

        assert!(!search.load_next_page());
        search.load().await;
        assert!(!search.load_next_page());
        assert_eq!(search.filters().cursor, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pages_forward_and_back_through_cache() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(listing_payload(&numbers(1..=20), 45, Some("c1")));
        executor.push_ok(listing_payload(&numbers(21..=40), 45, Some("c2")));
        executor.push_ok(listing_payload(&numbers(41..=45), 45, None));
        let mut search = search_with(&executor);

        search.load().await;
        assert!(search.load_next_page());
        let second = search.load().await;
        assert_eq!(second.items[0].number, 21);
        assert!(second.has_previous_page);
        assert_eq!(executor.last_variables().unwrap()["after"], "c1");

        assert!(search.load_next_page());
        let third = search.load().await;
        assert_eq!(third.page_number, 3);
        assert!(!third.has_next_page);

        assert!(search.load_previous_page());
        assert_eq!(search.filters().cursor.as_deref(), Some("c1"));
        let back = search.view();
        assert_eq!(back.items[0].number, 21);
        assert!(!back.is_fetching);

        assert!(search.load_previous_page());
        assert_eq!(search.filters().cursor, None);
        assert!(!search.load_previous_page());
        assert_eq!(search.view().items[0].number, 1);

        assert_eq!(executor.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_pages_back_without_start_cursor() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(search_payload(&[1, 2], 4, Some("s1")));
        executor.push_ok(search_payload(&[3, 4], 4, None));
        let mut search = search_with(&executor);
        search.set_search_term("leak");

        search.load().await;
        assert!(search.load_next_page());
        let second = search.load().await;
        assert!(!second.page_info.has_previous_page);
        assert!(second.has_previous_page);

        assert!(search.load_previous_page());
        assert_eq!(search.view().items[0].number, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_filters() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(listing_payload(&[1], 2, Some("c1")));
        let mut search = search_with(&executor);
        search.set_state_filter(StateFilter::All);
        search.load().await;
        search.load_next_page();
        search.set_search_term("x");

        search.reset_filters();

        assert_eq!(search.filters(), &ListingFilters::new(20));
        assert!(!search.has_previous_page());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_bypasses_freshness() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(listing_payload(&[1], 1, None));
        executor.push_ok(listing_payload(&[1, 2], 2, None));
        let search = search_with(&executor);

        search.load().await;
        assert_eq!(search.view().items.len(), 1);

        let refreshed = search.refresh().await;
        assert_eq!(refreshed.items.len(), 2);
        assert_eq!(executor.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_surfaces_in_view() {
        let executor = ScriptedExecutor::new();
        executor.push_err(FetchError::Auth {
            message: "Bad credentials".into(),
        });
        let search = search_with(&executor);

        let view = search.load().await;

        assert!(view.items.is_empty());
        assert!(!view.is_loading);
        assert!(matches!(view.error, Some(FetchError::Auth { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_reports_loading_before_first_response() {
        let executor = ScriptedExecutor::new();
        executor.push_ok(listing_payload(&[1], 1, None));
        let search = search_with(&executor);

        let view = search.view();
        assert!(view.is_loading);
        assert!(view.items.is_empty());

        let loaded = search.load().await;
        assert!(!loaded.is_loading);
        assert_eq!(executor.calls(), 1);
    }

    #[test]
    fn test_page_size_clamped_to_max() {
        let executor = ScriptedExecutor::new();
        let mut search = search_with(&executor);
        search.set_page_size(1000);
        assert_eq!(search.filters().page_size, 100);
        search.set_page_size(0);
        assert_eq!(search.filters().page_size, 1);
    }
}
