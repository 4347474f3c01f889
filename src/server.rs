//! HTTP front for the handler: every request is turned into a proxy-style
//! request, exactly as a gateway with a greedy `/{proxy+}` route would pass it.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handler::{Handler, ProxyRequest, ProxyResponse};

pub fn router(handler: Arc<Handler>) -> Router {
    Router::new()
        .fallback(proxy)
        .with_state(handler)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(address: SocketAddr, handler: Arc<Handler>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}

async fn proxy(
    State(handler): State<Arc<Handler>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = to_proxy_request(&method, &uri, &headers, &body);
    into_http_response(handler.handle(request).await)
}

fn to_proxy_request(method: &Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) -> ProxyRequest {
    let path = uri.path();
    let mut request = ProxyRequest::new(method.as_str());
    request.path = Some(path.to_string());

    let capture = path.trim_start_matches('/');
    if !capture.is_empty() {
        request = request.with_path_parameter("proxy", capture);
    }

    request.headers = Some(
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect::<HashMap<_, _>>(),
    );

    if !body.is_empty() {
        request = request.with_body(String::from_utf8_lossy(body));
    }
    request
}

fn into_http_response(response: ProxyResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
