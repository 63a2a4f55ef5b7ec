use crate::config::AppState;
use crate::sessions::spawn_sweeper;
use anyhow::Result;
use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

mod mcp;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Start the HTTP transport
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let _sweeper = spawn_sweeper(state.sessions.clone(), SWEEP_INTERVAL);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("MCP endpoint: http://{}/mcp", addr);
    tracing::info!("Health check endpoints: /health and /healthz");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Create the HTTP router
pub(crate) fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route(
            "/mcp",
            post(mcp::handle_post)
                .delete(mcp::handle_delete)
                .get(mcp::handle_get),
        )
        .fallback(not_found)
        // Middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": state.mcp.info().name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    tracing::warn!(%method, path = %uri.path(), "Unhandled route");
    (StatusCode::NOT_FOUND, "404 page not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::Body;
    use axum::http::{header, Request};
    use mcpdemo_core::{CallToolResult, JsonRpcError, JsonRpcResponse, ListToolsResult, SESSION_ID_HEADER};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router() -> Router {
        create_router(AppState::new(&ServerConfig::default()).unwrap())
    }

    fn post_json(body: Value, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json, text/event-stream");
        if let Some(id) = session {
            builder = builder.header(SESSION_ID_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn initialize_body() -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "1"}
            }
        })
    }

    async fn open_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(post_json(initialize_body(), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response
            .headers()
            .get(SESSION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        for path in ["/health", "/healthz"] {
            let response = router()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = body_json(response).await;
            assert_eq!(body["status"], "ok");
            assert_eq!(body["service"], "mcpdemo");
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = router();
        let session = open_session(&app).await;

        let response = app
            .clone()
            .oneshot(post_json(
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
                Some(&session),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .clone()
            .oneshot(post_json(
                json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
                Some(&session),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed: ListToolsResult = serde_json::from_value::<JsonRpcResponse>(body_json(response).await)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(listed.tools.len(), 3);

        let response = app
            .clone()
            .oneshot(post_json(
                json!({
                    "jsonrpc": "2.0",
                    "id": 3,
                    "method": "tools/call",
                    "params": {"name": "echotest", "arguments": {"message": "hello"}}
                }),
                Some(&session),
            ))
            .await
            .unwrap();
        let result: CallToolResult = serde_json::from_value::<JsonRpcResponse>(body_json(response).await)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(result.text_content(), "hello");

        let delete = Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .header(SESSION_ID_HEADER, &session)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post_json(
                json!({"jsonrpc": "2.0", "id": 4, "method": "ping"}),
                Some(&session),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_session_header_is_400() {
        let response = router()
            .oneshot(post_json(
                json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_batch_returns_array() {
        let app = router();
        let session = open_session(&app).await;

        let response = app
            .oneshot(post_json(
                json!([
                    {"jsonrpc": "2.0", "id": 10, "method": "ping"},
                    {"jsonrpc": "2.0", "method": "notifications/initialized"},
                    {"jsonrpc": "2.0", "id": 11, "method": "tools/call",
                     "params": {"name": "timeserver", "arguments": {"timezone": "Not/AZone"}}}
                ]),
                Some(&session),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], 10);
        assert_eq!(items[1]["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_get_not_offered() {
        let response = router()
            .oneshot(Request::builder().uri("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
