//! HTTP client for the MediLink message store

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use super::MessageStore;
use crate::config::{ClientConfig, RequestPolicy};
use crate::types::{CreateMessageRequest, ErrorBody, Message, SummaryResponse};
use crate::{Error, Operation, Result};

const MESSAGES_PATH: &str = "/messages";
const CLEAR_PATH: &str = "/messages/clear";
const SUMMARY_PATH: &str = "/summary/generate";

/// HTTP client for the message store
#[derive(Debug, Clone)]
pub struct StoreClient {
    base_url: String,
    client: Client,
    policy: RequestPolicy,
}

impl StoreClient {
    /// Create a new client rooted at `base_url` (prefix included).
    pub fn new(base_url: &str, policy: RequestPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            policy,
        })
    }

    /// Create a client from the server URL, prefix and request policy in `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let prefix = config.api_prefix.trim().trim_matches('/');
        let base_url = if prefix.is_empty() {
            config.server_url.trim_end_matches('/').to_string()
        } else {
            format!("{}/{}", config.server_url.trim_end_matches('/'), prefix)
        };
        Self::new(&base_url, config.request_policy())
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> &RequestPolicy {
        &self.policy
    }

    // ========================================================================
    // Internal HTTP Methods
    // ========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and turn non-2xx responses into [`Error::Status`].
    async fn execute(&self, operation: Operation, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // The body is advisory; a missing or malformed one falls back to generic text
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| operation.fallback_message().to_string());

        Err(Error::Status {
            operation,
            status: status.as_u16(),
            message,
        })
    }

    /// Read the whole body and validate it against `T`.
    async fn read_json<T: DeserializeOwned>(&self, operation: Operation, response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        serde_json::from_slice(&bytes).map_err(|e| Error::InvalidResponse {
            operation,
            detail: e.to_string(),
        })
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, operation: Operation, path: &str) -> Result<T> {
        let response = self.execute(operation, self.client.get(self.url(path))).await?;
        self.read_json(operation, response).await
    }

    /// Make a POST request with a JSON body
    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        operation: Operation,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.client.post(self.url(path)).json(body);
        let response = self.execute(operation, request).await?;
        self.read_json(operation, response).await
    }

    /// Make a POST request without a body, returning the raw response
    async fn post_empty(&self, operation: Operation, path: &str) -> Result<Response> {
        self.execute(operation, self.client.post(self.url(path))).await
    }

    fn transport_error(&self, operation: Operation, source: reqwest::Error) -> Error {
        if source.is_timeout() {
            Error::Timeout {
                operation,
                timeout: self.policy.timeout,
            }
        } else {
            Error::Transport { operation, source }
        }
    }
}

/// Whether a failed read is worth another attempt.
fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Transport { .. } | Error::Timeout { .. } => true,
        Error::Status { status, .. } => {
            StatusCode::from_u16(*status).map_or(false, |s| s.is_server_error())
        }
        _ => false,
    }
}

#[async_trait]
impl MessageStore for StoreClient {
    async fn list_messages(&self) -> Result<Vec<Message>> {
        let mut attempt = 0;
        loop {
            match self.get(Operation::ListMessages, MESSAGES_PATH).await {
                Ok(messages) => return Ok(messages),
                Err(e) if attempt < self.policy.read_retries && is_retryable(&e) => {
                    attempt += 1;
                    let delay = self.policy.backoff_for(attempt);
                    tracing::debug!("List attempt {} failed ({}), retrying in {:?}", attempt, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn create_message(&self, request: &CreateMessageRequest) -> Result<Message> {
        self.post(Operation::SendMessage, MESSAGES_PATH, request).await
    }

    async fn clear_messages(&self) -> Result<()> {
        // 200 and 204 both count; any body is ignored
        self.post_empty(Operation::ClearMessages, CLEAR_PATH).await?;
        Ok(())
    }

    async fn generate_summary(&self) -> Result<String> {
        let response = self.post_empty(Operation::GenerateSummary, SUMMARY_PATH).await?;
        let body: SummaryResponse = self.read_json(Operation::GenerateSummary, response).await?;
        Ok(body.summary)
    }
}
