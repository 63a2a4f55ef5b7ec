//! Streamable HTTP transport for the mcpdemo SDK.

use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};
use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use mcpdemo_core::{JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION_HEADER, SESSION_ID_HEADER};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Session headers attached to every request after `initialize`.
#[derive(Debug, Clone, Default)]
pub struct SessionHeaders {
    pub session_id: Option<String>,
    pub protocol_version: Option<String>,
}

/// What the server sent back for one POSTed message.
#[derive(Debug, Clone)]
pub struct Reply {
    /// `Mcp-Session-Id` from the response, if any.
    pub session_id: Option<String>,
    /// The JSON-RPC response; `None` for `202 Accepted`.
    pub response: Option<JsonRpcResponse>,
}

/// HTTP transport for posting JSON-RPC messages to one endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    pub fn new(config: Arc<ClientConfig>) -> SdkResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/event-stream"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    fn with_session(&self, builder: RequestBuilder, session: &SessionHeaders) -> RequestBuilder {
        let mut builder = builder;
        if let Some(ref id) = session.session_id {
            builder = builder.header(SESSION_ID_HEADER, id);
        }
        if let Some(ref version) = session.protocol_version {
            builder = builder.header(PROTOCOL_VERSION_HEADER, version);
        }
        builder
    }

    /// Execute a request, retrying up to `max_retries` times.
    async fn execute(&self, request_builder: RequestBuilder, max_retries: u32) -> SdkResult<Response> {
        let retry_config = &self.config.retry_config;
        let mut attempts = 0;

        loop {
            let request = request_builder
                .try_clone()
                .ok_or_else(|| SdkError::Config("Request cannot be cloned".to_string()))?;

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if response.status().is_success() {
                        return Ok(response);
                    }

                    // Check if we should retry
                    if attempts < max_retries && retry_config.should_retry_status(status) {
                        let backoff = retry_config.backoff_for_attempt(attempts);
                        warn!(
                            status = status,
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }

                    // Return error for non-success status
                    let body = response.text().await.unwrap_or_default();
                    return Err(SdkError::from_response(status, &body));
                }
                Err(e) => {
                    let err = SdkError::from(e);
                    if attempts < max_retries && err.is_retryable() {
                        let backoff = retry_config.backoff_for_attempt(attempts);
                        warn!(
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            error = %err,
                            "Request did not reach the server, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// POST one message and decode the matching reply. Never retried: the
    /// server may already have acted on it.
    pub async fn send(&self, message: &JsonRpcRequest, session: &SessionHeaders) -> SdkResult<Reply> {
        self.post(message, session, 0).await
    }

    /// POST with the configured retry policy. Only for the handshake.
    pub async fn send_with_retry(
        &self,
        message: &JsonRpcRequest,
        session: &SessionHeaders,
    ) -> SdkResult<Reply> {
        self.post(message, session, self.config.retry_config.max_retries)
            .await
    }

    async fn post(
        &self,
        message: &JsonRpcRequest,
        session: &SessionHeaders,
        max_retries: u32,
    ) -> SdkResult<Reply> {
        debug!(url = %self.config.url, method = %message.method, "POST message");

        let builder = self
            .with_session(self.client.post(self.config.url.clone()), session)
            .json(message);
        let response = self.execute(builder, max_retries).await?;

        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if response.status() == StatusCode::ACCEPTED || message.is_notification() {
            return Ok(Reply {
                session_id,
                response: None,
            });
        }

        let is_sse = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let id = message.id.clone().unwrap_or(Value::Null);
        let found = if is_sse {
            read_event_stream(response, &id).await?
        } else {
            let body = response.text().await?;
            decode_responses(&body).into_iter().find(|r| r.id == id)
        };

        let response = found.ok_or_else(|| {
            SdkError::InvalidResponse(format!("no response with id {} for {}", id, message.method))
        })?;

        Ok(Reply {
            session_id,
            response: Some(response),
        })
    }

    /// Ask the server to drop a session. 404 and 405 count as done.
    pub async fn terminate(&self, session: &SessionHeaders) -> SdkResult<()> {
        debug!(url = %self.config.url, "DELETE session");

        let builder = self.with_session(self.client.delete(self.config.url.clone()), session);
        match builder.send().await?.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => Ok(()),
            status => Err(SdkError::Api {
                status: status.as_u16(),
                message: "session termination refused".to_string(),
            }),
        }
    }
}

/// Read events until one carries the response with `id`.
///
/// Returns as soon as it is found; the server may keep the stream open.
async fn read_event_stream(response: Response, id: &Value) -> SdkResult<Option<JsonRpcResponse>> {
    let mut events = response.bytes_stream().eventsource();

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(EventStreamError::Transport(e)) => return Err(e.into()),
            Err(e) => return Err(SdkError::InvalidResponse(format!("event stream: {}", e))),
        };

        if let Some(found) = decode_responses(&event.data).into_iter().find(|r| &r.id == id) {
            return Ok(Some(found));
        }
        debug!(event = %event.event, "Skipping unrelated event");
    }

    Ok(None)
}

/// Decode a payload holding one response or a batch of them.
fn decode_responses(payload: &str) -> Vec<JsonRpcResponse> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Ok(value) => serde_json::from_value(value).into_iter().collect(),
        Err(_) => Vec::new(),
    }
}
