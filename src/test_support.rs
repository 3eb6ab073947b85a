//! Scripted executor for exercising the query layer without a network.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use crate::client::{FetchExecutor, Fetched};
use crate::error::FetchError;

fn fetched(data: Value) -> Fetched {
    Fetched {
        data,
        errors: Vec::new(),
    }
}

struct Step {
    delay: Duration,
    outcome: Result<Fetched, FetchError>,
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    call_times: Vec<Instant>,
    requests: Vec<(String, Value)>,
}

/// Replays queued outcomes in order and records every call.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    script: Arc<Mutex<Script>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: Result<Fetched, FetchError>) {
        self.push_after(outcome, Duration::ZERO);
    }

    pub fn push_after(&self, outcome: Result<Fetched, FetchError>, delay: Duration) {
        self.script.lock().steps.push_back(Step { delay, outcome });
    }

    pub fn push_ok(&self, data: Value) {
        self.push(Ok(fetched(data)));
    }

    pub fn push_ok_after(&self, data: Value, delay: Duration) {
        self.push_after(Ok(fetched(data)), delay);
    }

    pub fn push_err(&self, error: FetchError) {
        self.push(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.script.lock().call_times.len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.script.lock().call_times.clone()
    }

    /// Documents and variables seen by [`FetchExecutor::execute`].
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.script.lock().requests.clone()
    }

    pub fn last_variables(&self) -> Option<Value> {
        self.script.lock().requests.last().map(|(_, v)| v.clone())
    }

    /// A fetch closure suitable for [`crate::query::QueryClient`].
    pub fn fetcher(
        &self,
    ) -> impl Fn() -> BoxFuture<'static, Result<Fetched, FetchError>> + Send + Sync + 'static {
        let this = self.clone();
        move || {
            let this = this.clone();
            async move { this.next().await }.boxed()
        }
    }

    async fn next(&self) -> Result<Fetched, FetchError> {
        let step = {
            let mut script = self.script.lock();
            script.call_times.push(Instant::now());
            script.steps.pop_front()
        };
        let Some(step) = step else {
            return Err(FetchError::Transport {
                status: None,
                message: "script exhausted".to_string(),
            });
        };
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.outcome
    }
}

#[async_trait]
impl FetchExecutor for ScriptedExecutor {
    async fn execute(&self, document: &str, variables: Value) -> Result<Fetched, FetchError> {
        self.script
            .lock()
            .requests
            .push((document.to_string(), variables));
        self.next().await
    }
}

/// A summary issue node as the listing and search queries return it.
pub fn issue_json(number: u64, comment_count: u64) -> Value {
    serde_json::json!({
        "id": format!("I_{number}"),
        "number": number,
        "title": format!("Issue {number}"),
        "body": format!("Body of issue {number}"),
        "state": "OPEN",
        "createdAt": "2025-01-01T00:00:00Z",
        "updatedAt": "2025-01-02T00:00:00Z",
        "author": { "login": "octocat", "avatarUrl": "https://example.com/a.png" },
        "labels": { "nodes": [{ "id": "L_1", "name": "bug", "color": "d73a4a" }] },
        "comments": { "totalCount": comment_count }
    })
}

fn connection_json(numbers: &[u64], total: u64, next_cursor: Option<&str>) -> Value {
    serde_json::json!({
        "totalCount": total,
        "pageInfo": {
            "hasNextPage": next_cursor.is_some(),
            "hasPreviousPage": false,
            "startCursor": null,
            "endCursor": next_cursor,
        },
        "nodes": numbers.iter().map(|n| issue_json(*n, 0)).collect::<Vec<_>>(),
    })
}

pub fn listing_payload(numbers: &[u64], total: u64, next_cursor: Option<&str>) -> Value {
    serde_json::json!({ "repository": { "issues": connection_json(numbers, total, next_cursor) } })
}

pub fn search_payload(numbers: &[u64], total: u64, next_cursor: Option<&str>) -> Value {
    let mut conn = connection_json(numbers, total, next_cursor);
    if let Some(obj) = conn.as_object_mut() {
        if let Some(count) = obj.remove("totalCount") {
            obj.insert("issueCount".to_string(), count);
        }
    }
    serde_json::json!({ "search": conn })
}
