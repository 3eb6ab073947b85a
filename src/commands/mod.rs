pub mod browse;
pub mod comments;
pub mod init;
pub mod issues;

use std::sync::Arc;

use crate::cache::ResultCache;
use crate::client::{FetchExecutor, GitHubClient};
use crate::config::{Config, Repository};
use crate::detail::{CommentFeed, IssueDetailQuery};
use crate::error::{FetchError, GhiError, Result};
use crate::output;
use crate::query::{QueryClient, QueryOptions};
use crate::search::{IssueSearch, ListingFilters};

/// Everything a command needs to talk to one repository.
pub struct Context {
    pub config: Config,
    pub repo: Repository,
    pub client: QueryClient,
    pub executor: Arc<dyn FetchExecutor>,
    pub options: QueryOptions,
}

impl Context {
    pub fn from_config(config: Config) -> Result<Self> {
        let token = config.token()?;
        let repo = config.repository()?;
        let executor: Arc<dyn FetchExecutor> = Arc::new(GitHubClient::new(
            config.endpoint(),
            token,
            config.request_timeout(),
        )?);
        Ok(Self::new(config, repo, executor))
    }

    pub fn new(config: Config, repo: Repository, executor: Arc<dyn FetchExecutor>) -> Self {
        let client = QueryClient::with_gc_time(ResultCache::default(), config.gc_time());
        let options = QueryOptions::default()
            .with_stale_time(config.stale_time())
            .with_retry(config.retry_policy());
        Self {
            config,
            repo,
            client,
            executor,
            options,
        }
    }

    /// `limit` clamped to the configured bounds, or the default page size.
    fn page_size(&self, limit: Option<u32>) -> u32 {
        limit.map_or_else(
            || self.config.default_page_size(),
            |n| self.config.clamp_page_size(n),
        )
    }

    pub fn listing_filters(&self, limit: Option<u32>) -> ListingFilters {
        ListingFilters::new(self.page_size(limit))
    }

    pub fn issue_search(&self, defaults: ListingFilters) -> IssueSearch {
        IssueSearch::new(
            self.client.clone(),
            Arc::clone(&self.executor),
            self.repo.clone(),
            defaults,
            self.config.max_page_size(),
        )
        .with_options(self.options.clone())
    }

    pub fn issue_detail(&self, number: u64) -> IssueDetailQuery {
        IssueDetailQuery::new(
            self.client.clone(),
            Arc::clone(&self.executor),
            self.repo.clone(),
            number,
        )
        .with_options(self.options.clone())
    }

    pub fn comment_feed(&self, number: u64, limit: Option<u32>) -> CommentFeed {
        CommentFeed::new(
            self.client.clone(),
            Arc::clone(&self.executor),
            self.repo.clone(),
            number,
            self.page_size(limit),
        )
        .with_options(self.options.clone())
    }
}

/// Turn a view's error into a command failure unless there is still data
/// to show, in which case it is reported and rendering continues.
pub fn check_error(error: Option<&FetchError>, has_data: bool) -> Result<()> {
    match error {
        None => Ok(()),
        Some(err) if has_data => {
            output::print_message(&format!("warning: {err}"));
            Ok(())
        }
        Some(err) => Err(GhiError::Fetch(err.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        let config = Config {
            default_page_size: Some(30),
            max_page_size: Some(50),
            ..Config::default()
        };
        let repo = Repository {
            owner: "octo".into(),
            name: "repo".into(),
        };
        Context::new(config, repo, Arc::new(crate::test_support::ScriptedExecutor::new()))
    }

    #[test]
    fn test_listing_filters_respect_config() {
        let ctx = context();
        assert_eq!(ctx.listing_filters(None).page_size, 30);
        assert_eq!(ctx.listing_filters(Some(500)).page_size, 50);
        assert_eq!(ctx.listing_filters(Some(5)).page_size, 5);
    }

    #[test]
    fn test_check_error() {
        let err = FetchError::EmptyResponse;
        assert!(check_error(None, false).is_ok());
        assert!(check_error(Some(&err), true).is_ok());
        assert!(matches!(
            check_error(Some(&err), false),
            Err(GhiError::Fetch(FetchError::EmptyResponse))
        ));
    }

    #[test]
    fn test_from_config_requires_token_and_repository() {
        assert!(matches!(
            Context::from_config(Config::default()),
            Err(GhiError::MissingToken)
        ));
        let config = Config {
            token: Some("ghp_x".into()),
            ..Config::default()
        };
        assert!(matches!(
            Context::from_config(config),
            Err(GhiError::MissingRepository)
        ));
    }
}
