use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.github.com/graphql";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw result of one GraphQL request.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub data: Value,
    /// Field-level errors returned alongside `data`.
    pub errors: Vec<String>,
}

impl Fetched {
    /// The partial-data error to attach to the cached entry, if any.
    pub fn partial_error(&self) -> Option<FetchError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(FetchError::PartialData {
                messages: self.errors.clone(),
            })
        }
    }
}

/// Executes one GraphQL document with variables.
#[async_trait]
pub trait FetchExecutor: Send + Sync {
    async fn execute(&self, document: &str, variables: Value) -> Result<Fetched, FetchError>;
}

/// Turn one request into a re-runnable fetch for the query layer.
pub fn request_fn(
    executor: Arc<dyn FetchExecutor>,
    document: &'static str,
    variables: Value,
) -> impl Fn() -> BoxFuture<'static, Result<Fetched, FetchError>> + Send + Sync + 'static {
    move || {
        let executor = Arc::clone(&executor);
        let variables = variables.clone();
        async move { executor.execute(document, variables).await }.boxed()
    }
}

pub struct GitHubClient {
    http: Client,
    endpoint: String,
    token: String,
}

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Deserialize, Debug)]
struct GraphQLError {
    message: String,
}

impl GitHubClient {
    /// A request that exceeds `timeout` fails as a retryable transport error.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl FetchExecutor for GitHubClient {
    async fn execute(&self, document: &str, variables: Value) -> Result<Fetched, FetchError> {
        if self.token.is_empty() {
            return Err(FetchError::Auth {
                message: "no token configured".to_string(),
            });
        }

        let request = GraphQLRequest {
            query: document,
            variables,
        };

        tracing::debug!(endpoint = %self.endpoint, "sending GraphQL request");

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, concat!("ghi/", env!("CARGO_PKG_VERSION")))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(
                status.as_u16(),
                response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<failed to read response body>".to_string()),
            ));
        }

        let gql_response: GraphQLResponse = response.json().await?;
        let messages: Vec<String> = gql_response
            .errors
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.message)
            .collect();

        match gql_response.data {
            Some(data) if !data.is_null() => Ok(Fetched {
                data,
                errors: messages,
            }),
            _ if !messages.is_empty() => Err(FetchError::GraphQL { messages }),
            _ => Err(FetchError::EmptyResponse),
        }
    }
}
