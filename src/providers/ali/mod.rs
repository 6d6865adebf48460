//! Ali DashScope asynchronous image tasks.
//!
//! Image generation is submit-then-poll: the submit call (made by the relay
//! layer) returns a task id, which is then polled at
//! `GET {base}/api/v1/tasks/{task_id}` until the task finishes. A successful
//! task is translated into the canonical image response.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::clock::Clock;
use crate::core::http::{Auth, get_bytes, join_url};
use crate::core::job_poller::{AsyncJob, JobPoller, TaskSnapshot, TaskSource};
use crate::core::models::{ImageResponse, ResponseFormat};
use crate::core::translate::{AssetFetcher, OutputItem, translate_items};
use crate::error::{RelayError, Result};

/// Vendor label used in upstream errors.
pub const VENDOR: &str = "ali";

// =============================================================================
// Wire Types
// =============================================================================

/// One generated image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub b64_image: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub task_status: String,
    #[serde(default)]
    pub results: Vec<TaskResult>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Submit and status responses share this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub output: TaskOutput,
}

impl TaskSnapshot for TaskResponse {
    fn task_status(&self) -> &str {
        &self.output.task_status
    }
}

// =============================================================================
// Status Client
// =============================================================================

/// Bearer-authenticated task status client.
#[derive(Debug, Clone)]
pub struct DashScopeTaskClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DashScopeTaskClient {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TaskSource for DashScopeTaskClient {
    type Snapshot = TaskResponse;

    async fn fetch_task(&self, task_id: &str) -> Result<TaskResponse> {
        let url = join_url(&self.base_url, &format!("/api/v1/tasks/{task_id}"));
        let body = get_bytes(&self.client, &url, Some(&Auth::bearer(&self.api_key)))
            .await
            .inspect_err(|e| tracing::error!(task_id, error = %e, "Task status request failed"))?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(task_id, error = %e, "Task status response malformed");
            RelayError::decode(format!("task {task_id} status"), e)
        })
    }
}

// =============================================================================
// Translation
// =============================================================================

/// Translate a terminal task into the canonical response.
///
/// # Errors
///
/// Returns [`RelayError::Upstream`] carrying the vendor's code and message when
/// the task did not succeed.
pub async fn to_image_response(
    job: &AsyncJob<TaskResponse>,
    format: ResponseFormat,
    created: i64,
    fetcher: &dyn AssetFetcher,
) -> Result<ImageResponse> {
    if !job.succeeded() {
        let output = &job.snapshot.output;
        return Err(RelayError::upstream(
            VENDOR,
            &output.code,
            output.message.clone(),
        ));
    }

    let items: Vec<OutputItem> = job
        .snapshot
        .output
        .results
        .iter()
        .map(|r| OutputItem {
            url: r.url.clone(),
            embedded: (!r.b64_image.is_empty()).then(|| r.b64_image.clone()),
        })
        .collect();

    Ok(translate_items(&items, format, created, fetcher).await)
}

// =============================================================================
// Handler
// =============================================================================

/// Completes an image request from its submit response to the final body.
pub struct ImageTaskHandler<S> {
    source: S,
    poller: JobPoller,
    fetcher: Arc<dyn AssetFetcher>,
    clock: Arc<dyn Clock>,
}

impl<S: TaskSource<Snapshot = TaskResponse>> ImageTaskHandler<S> {
    #[must_use]
    pub fn new(
        source: S,
        poller: JobPoller,
        fetcher: Arc<dyn AssetFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            poller,
            fetcher,
            clock,
        }
    }

    /// Poll `task_id` and translate the result.
    ///
    /// # Errors
    ///
    /// Transport/decode errors from polling, [`RelayError::Timeout`],
    /// [`RelayError::Canceled`], or [`RelayError::Upstream`] for failed tasks.
    pub async fn wait_and_translate(
        &self,
        task_id: &str,
        format: ResponseFormat,
        cancel: &CancellationToken,
    ) -> Result<ImageResponse> {
        let created = self.clock.now().timestamp();
        let job = self.poller.wait(&self.source, task_id, cancel).await?;
        to_image_response(&job, format, created, self.fetcher.as_ref()).await
    }

    /// Take the raw submit response body and produce the JSON body to return
    /// to the caller.
    ///
    /// # Errors
    ///
    /// [`RelayError::Decode`] for a malformed submit body,
    /// [`RelayError::Upstream`] when submission itself was rejected, plus
    /// everything [`Self::wait_and_translate`] returns.
    pub async fn complete(
        &self,
        submit_body: &[u8],
        format: ResponseFormat,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let submitted: TaskResponse = serde_json::from_slice(submit_body)
            .map_err(|e| RelayError::decode("task submit response", e))?;

        if !submitted.message.is_empty() {
            tracing::error!(
                request_id = %submitted.request_id,
                message = %submitted.message,
                "ali_async_task_failed"
            );
            return Err(RelayError::upstream(
                VENDOR,
                &submitted.code,
                submitted.message,
            ));
        }

        let task_id = submitted.output.task_id;
        if task_id.is_empty() {
            return Err(RelayError::NotFound {
                what: "task id in submit response".to_string(),
            });
        }

        let response = self.wait_and_translate(&task_id, format, cancel).await?;
        Ok(serde_json::to_vec(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job_poller::TaskStatus;

    struct NoFetch;

    #[async_trait]
    impl AssetFetcher for NoFetch {
        async fn fetch_base64(&self, url: &str) -> Result<String> {
            Err(RelayError::NotFound {
                what: url.to_string(),
            })
        }
    }

    fn job(status: &str, results: Vec<TaskResult>) -> AsyncJob<TaskResponse> {
        AsyncJob {
            task_id: "t-1".to_string(),
            status: Some(TaskStatus::parse(status)),
            attempts: 1,
            snapshot: TaskResponse {
                output: TaskOutput {
                    task_id: "t-1".to_string(),
                    task_status: status.to_string(),
                    results,
                    code: "DataInspectionFailed".to_string(),
                    message: "Output data may contain inappropriate content.".to_string(),
                },
                ..TaskResponse::default()
            },
        }
    }

    #[test]
    fn task_response_decodes_vendor_payload() {
        let raw = r#"{
            "request_id": "r-1",
            "output": {
                "task_id": "t-1",
                "task_status": "SUCCEEDED",
                "results": [{"url": "https://cdn/a.png"}, {"code": "x", "message": "y"}]
            },
            "usage": {"image_count": 1}
        }"#;
        let response: TaskResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.task_status(), "SUCCEEDED");
        assert_eq!(response.output.results.len(), 2);
        assert!(response.message.is_empty());
    }

    #[tokio::test]
    async fn failed_task_becomes_upstream_error() {
        for status in ["FAILED", "CANCELED", "UNKNOWN"] {
            let err = to_image_response(&job(status, vec![]), ResponseFormat::Url, 0, &NoFetch)
                .await
                .unwrap_err();
            match err {
                RelayError::Upstream { vendor, code, message } => {
                    assert_eq!(vendor, "ali");
                    assert_eq!(code, "DataInspectionFailed");
                    assert!(message.contains("inappropriate"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn succeeded_task_passes_vendor_b64_through() {
        let results = vec![TaskResult {
            url: "https://cdn/a.png".to_string(),
            b64_image: "QUJD".to_string(),
            ..TaskResult::default()
        }];
        let task = job("SUCCEEDED", results);
        let response = to_image_response(&task, ResponseFormat::Url, 7, &NoFetch)
            .await
            .unwrap();
        assert_eq!(response.created, 7);
        assert_eq!(response.data[0].b64_json, "QUJD");
    }
}
