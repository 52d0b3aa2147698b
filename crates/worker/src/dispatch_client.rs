//! Client side of the dispatch service protocol.

use async_trait::async_trait;
use cfa_core::job::Job;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

/// Identity handed back by `GET /api/init`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Registration {
    pub worker_id: String,
    #[serde(default)]
    pub created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchClientError {
    /// The request never got a response (service down, DNS, ...).
    #[error("Dispatch service request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with an unexpected status.
    #[error("Dispatch service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// An upload was answered with a non-2xx status.
    #[error("Upload rejected ({status}): {body}")]
    UploadFailed { status: u16, body: String },
}

/// Operations the worker loop needs from the dispatch service.
#[async_trait]
pub trait DispatchApi: Send + Sync {
    /// Present `worker_id` (possibly the `N/A` sentinel) and get the
    /// identity to use from now on.
    async fn register(&self, worker_id: &str) -> Result<Registration, DispatchClientError>;

    /// Ask for the next job. `Ok(None)` when the service has nothing to
    /// hand out.
    async fn pull_job(
        &self,
        worker_id: &str,
        checkpoints: &[String],
    ) -> Result<Option<Job>, DispatchClientError>;

    /// Upload PNG results for `job`.
    async fn upload_result(
        &self,
        worker_id: &str,
        job: &Job,
        images: Vec<Vec<u8>>,
    ) -> Result<(), DispatchClientError>;
}

/// [`DispatchApi`] over HTTP.
#[derive(Clone)]
pub struct HttpDispatchClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDispatchClient {
    /// * `base_url` - e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl DispatchApi for HttpDispatchClient {
    async fn register(&self, worker_id: &str) -> Result<Registration, DispatchClientError> {
        let response = self
            .client
            .get(self.url("/api/init"))
            .json(&json!({ "worker_id": worker_id }))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn pull_job(
        &self,
        worker_id: &str,
        checkpoints: &[String],
    ) -> Result<Option<Job>, DispatchClientError> {
        let response = self
            .client
            .get(self.url("/api/get-job"))
            .json(&json!({ "checkpoints": checkpoints, "worker_id": worker_id }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(worker_id, reason = %error_message(&body), "No job handed out");
            return Ok(None);
        }

        let response = ensure_success(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn upload_result(
        &self,
        worker_id: &str,
        job: &Job,
        images: Vec<Vec<u8>>,
    ) -> Result<(), DispatchClientError> {
        let mut form = Form::new().text("worker_id", worker_id.to_string());
        for (i, image) in images.into_iter().enumerate() {
            let part = Part::bytes(image)
                .file_name(format!("image_{i}.png"))
                .mime_str("image/png")?;
            form = form.part("images", part);
        }

        let response = self
            .client
            .post(self.url("/api/upload"))
            .query(&[
                ("channel", job.requester_channel.as_str()),
                ("job_id", job.id.as_str()),
            ])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchClientError::UploadFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, DispatchClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(DispatchClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// The `error` field of a JSON error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
