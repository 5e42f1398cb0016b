//! HTTP client for the resume persistence service (`routes::resumes`).
//!
//! Transport errors and 5xx responses are retried with exponential backoff. That is
//! safe for every call here except `create_resume`, which is sent once.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::gateway::{GatewayError, GatewayResult, NewResume, ResumeGateway};
use crate::models::{ResumeDocument, ResumeRecord};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    retry_base_delay: Duration,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_base_delay: Duration::from_millis(500),
        }
    }

    /// Base delay of the backoff sequence (base, 2×base, 4×base).
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    fn resumes_url(&self) -> String {
        format!("{}/api/v1/resumes", self.base_url)
    }

    fn resume_url(&self, id: &str) -> String {
        format!("{}/api/v1/resumes/{}", self.base_url, id)
    }

    /// Sends the request built by `build`, retrying on transport errors and 5xx.
    async fn send_with_retry<F>(&self, id: &str, build: F) -> GatewayResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error: Option<GatewayError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "Gateway request attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match build().send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(e.into());
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() {
                let message = error_message(response).await;
                warn!("Gateway returned {}: {}", status, message);
                last_error = Some(GatewayError::Rejected {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }
            if status == StatusCode::NOT_FOUND {
                return Err(GatewayError::NotFound(id.to_string()));
            }
            if !status.is_success() {
                return Err(GatewayError::Rejected {
                    status: status.as_u16(),
                    message: error_message(response).await,
                });
            }
            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| {
            GatewayError::Transport(format!("gave up after {MAX_RETRIES} attempts"))
        }))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

/// Pulls the message out of the service's error envelope, falling back to the raw body.
async fn error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[async_trait]
impl ResumeGateway for HttpGateway {
    async fn list_resumes(&self) -> GatewayResult<Vec<ResumeRecord>> {
        let url = self.resumes_url();
        let response = self
            .send_with_retry("", || self.client.get(&url))
            .await?;
        Self::json(response).await
    }

    async fn create_resume(&self, new: NewResume) -> GatewayResult<ResumeRecord> {
        let response = self.client.post(self.resumes_url()).json(&new).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }
        Self::json(response).await
    }

    async fn fetch_resume(&self, id: &str) -> GatewayResult<ResumeRecord> {
        let url = self.resume_url(id);
        let response = self.send_with_retry(id, || self.client.get(&url)).await?;
        Self::json(response).await
    }

    async fn replace_resume(
        &self,
        id: &str,
        document: &ResumeDocument,
    ) -> GatewayResult<ResumeRecord> {
        let url = self.resume_url(id);
        let response = self
            .send_with_retry(id, || {
                self.client.request(Method::PUT, &url).json(document)
            })
            .await?;
        debug!("Replaced resume {id} over HTTP");
        Self::json(response).await
    }

    async fn delete_resume(&self, id: &str) -> GatewayResult<()> {
        let url = self.resume_url(id);
        self.send_with_retry(id, || self.client.delete(&url))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::gateway::InMemoryGateway;
    use crate::models::resume::fixtures::server_record;
    use crate::routes::build_router;
    use crate::state::AppState;

    /// Serves the real router over an in-memory gateway on an ephemeral port.
    async fn serve() -> (String, Arc<InMemoryGateway>) {
        let backend = Arc::new(InMemoryGateway::new());
        backend.insert(server_record());
        let app = build_router(AppState::new(backend.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), backend)
    }

    #[tokio::test]
    async fn test_fetch_and_replace_round_trip() {
        let (url, backend) = serve().await;
        let gw = HttpGateway::new(url);

        let record = gw.fetch_resume("resume-1").await.unwrap();
        assert_eq!(record.title, "Senior Dev Resume");

        let mut doc = record.into_document();
        doc.title = "Updated over HTTP".to_string();
        let saved = gw.replace_resume("resume-1", &doc).await.unwrap();
        assert_eq!(saved.title, "Updated over HTTP");
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_resume_maps_to_not_found() {
        let (url, _backend) = serve().await;
        let gw = HttpGateway::new(url);
        let err = gw.fetch_resume("missing").await.unwrap_err();
        assert_eq!(err, GatewayError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let (url, _backend) = serve().await;
        let gw = HttpGateway::new(url);
        let created = gw
            .create_resume(NewResume {
                title: Some("Second".to_string()),
                template: None,
            })
            .await
            .unwrap();
        assert_eq!(created.title, "Second");
        assert_eq!(gw.list_resumes().await.unwrap().len(), 2);
        gw.delete_resume(&created.id).await.unwrap();
        assert_eq!(gw.list_resumes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gw = HttpGateway::new(format!("http://{addr}"))
            .with_retry_base_delay(Duration::from_millis(1));
        let err = gw.fetch_resume("resume-1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)), "got {err:?}");
    }
}
