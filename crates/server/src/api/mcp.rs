// Streamable HTTP transport handlers for /mcp

use crate::config::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mcpdemo_core::{
    methods, IncomingMessage, InitializeParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    SESSION_ID_HEADER,
};
use serde_json::Value;
use std::sync::Arc;

fn rpc_error(status: StatusCode, error: JsonRpcError) -> Response {
    (status, Json(JsonRpcResponse::error(Value::Null, error))).into_response()
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_ID_HEADER).and_then(|v| v.to_str().ok())
}

/// POST /mcp: one message or a batch
pub async fn handle_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable request body");
            return rpc_error(StatusCode::BAD_REQUEST, JsonRpcError::parse_error());
        }
    };

    let (items, batch) = match payload {
        Value::Array(items) => (items, true),
        single => (vec![single], false),
    };
    if items.is_empty() {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            JsonRpcError::invalid_request("Empty batch"),
        );
    }

    let mut requests = Vec::with_capacity(items.len());
    let mut responses = Vec::new();
    for item in items {
        match serde_json::from_value::<IncomingMessage>(item) {
            Ok(IncomingMessage::Request(request)) => requests.push(request),
            // No server-initiated requests are ever sent, so nothing awaits these
            Ok(IncomingMessage::Response(response)) => {
                tracing::debug!(id = %response.id, "Ignoring client response");
            }
            Err(e) => responses.push(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::invalid_request(e.to_string()),
            )),
        }
    }

    let initialize = requests.iter().position(|r| r.method == methods::INITIALIZE);
    if let Some(index) = initialize {
        if batch {
            return rpc_error(
                StatusCode::BAD_REQUEST,
                JsonRpcError::invalid_request("initialize must not be part of a batch"),
            );
        }
        return initialize_session(&state, requests.swap_remove(index)).await;
    }

    let Some(id) = session_id(&headers) else {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            JsonRpcError::invalid_request("Missing Mcp-Session-Id header"),
        );
    };
    if !state.sessions.touch(id) {
        return rpc_error(
            StatusCode::NOT_FOUND,
            JsonRpcError::invalid_request("Session not found"),
        );
    }

    for request in requests {
        if let Some(response) = state.mcp.handle_request(request).await {
            responses.push(response);
        }
    }

    if responses.is_empty() {
        return StatusCode::ACCEPTED.into_response();
    }

    if batch {
        Json(responses).into_response()
    } else {
        match responses.pop() {
            Some(response) => Json(response).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        }
    }
}

async fn initialize_session(state: &AppState, request: JsonRpcRequest) -> Response {
    let client = request
        .parse_params::<InitializeParams>()
        .ok()
        .map(|p| p.client_info);

    let Some(response) = state.mcp.handle_request(request).await else {
        // An initialize without an id is a notification; nothing to answer
        return StatusCode::ACCEPTED.into_response();
    };

    let Some(version) = response
        .result
        .as_ref()
        .and_then(|r| r.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    };

    let session = state.sessions.create(client, version);
    tracing::info!(session = %session.id, "Session created");

    let mut http = Json(response).into_response();
    match HeaderValue::from_str(&session.id) {
        Ok(value) => {
            http.headers_mut().insert(SESSION_ID_HEADER, value);
        }
        Err(e) => {
            tracing::error!(error = %e, "Session id is not a valid header value");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    http
}

/// DELETE /mcp: end a session
pub async fn handle_delete(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            JsonRpcError::invalid_request("Missing Mcp-Session-Id header"),
        );
    };

    match state.sessions.remove(id) {
        Some(session) => {
            let client = session.client.map(|c| c.name).unwrap_or_default();
            let age = chrono::Utc::now().signed_duration_since(session.created_at);
            tracing::info!(
                session = %id,
                client = %client,
                protocol = %session.protocol_version,
                age_secs = age.num_seconds(),
                "Session closed by client"
            );
            StatusCode::OK.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /mcp: no server-initiated stream is offered
pub async fn handle_get() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST, DELETE")],
    )
        .into_response()
}
