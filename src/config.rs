use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::cache::DEFAULT_GC_TIME;
use crate::client::{DEFAULT_API_ENDPOINT, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{GhiError, Result};
use crate::query::{RetryPolicy, DEFAULT_STALE_TIME};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub owner: Option<String>,
    pub name: Option<String>,
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
    pub stale_time_secs: Option<u64>,
    pub gc_time_secs: Option<u64>,
    /// Attempts per fetch, including the first.
    pub retry_attempts: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

/// The repository whose issues are browsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| GhiError::ConfigRead {
                path: config_path.clone(),
                source: e,
            })?;

        Self::parse(&contents).map_err(|e| GhiError::ConfigParse {
            path: config_path,
            source: e,
        })
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "ghi")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(GhiError::NoConfigDir)
    }

    /// Environment variables take precedence over the config file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("GITHUB_TOKEN") {
            self.token = Some(token);
        }
        if let Some(url) = non_empty("GITHUB_API_URL") {
            self.api_url = Some(url);
        }
        if let Some(owner) = non_empty("GITHUB_REPO_OWNER") {
            self.owner = Some(owner);
        }
        if let Some(name) = non_empty("GITHUB_REPO_NAME") {
            self.name = Some(name);
        }
        if let Some(size) = non_empty("GHI_DEFAULT_PAGE_SIZE").and_then(|v| v.trim().parse().ok()) {
            self.default_page_size = Some(size);
        }
        if let Some(size) = non_empty("GHI_MAX_PAGE_SIZE").and_then(|v| v.trim().parse().ok()) {
            self.max_page_size = Some(size);
        }
    }

    pub fn token(&self) -> Result<String> {
        self.token.clone().ok_or(GhiError::MissingToken)
    }

    pub fn repository(&self) -> Result<Repository> {
        match (&self.owner, &self.name) {
            (Some(owner), Some(name)) => Ok(Repository {
                owner: owner.clone(),
                name: name.clone(),
            }),
            _ => Err(GhiError::MissingRepository),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_ENDPOINT)
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size.filter(|n| *n > 0).unwrap_or(MAX_PAGE_SIZE)
    }

    pub fn default_page_size(&self) -> u32 {
        self.clamp_page_size(self.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    /// Keep a requested page size within `1..=max_page_size`.
    pub fn clamp_page_size(&self, size: u32) -> u32 {
        size.clamp(1, self.max_page_size())
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_STALE_TIME)
    }

    pub fn gc_time(&self) -> Duration {
        self.gc_time_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GC_TIME)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .filter(|n| *n > 0)
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self
                .retry_attempts
                .map_or(default.max_attempts, |n| n.max(1)),
            ..default
        }
    }
}
