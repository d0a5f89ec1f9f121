/// Last-resort error handling
///
/// [`handle_panic`] turns a panicking handler into the standard 500 envelope.
/// [`expose_error_detail`] copies the [`ErrorDetail`] of a 500 into its body
/// as `stack`; the router installs it only in development.

use crate::error::{ErrorDetail, ErrorResponse};
use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;

/// Panic handler for `tower_http::catch_panic::CatchPanicLayer::custom`
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    tracing::error!(panic = %detail, "Request handler panicked");

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error")),
    )
        .into_response();
    response.extensions_mut().insert(ErrorDetail(detail));
    response
}

/// Adds `stack` to failure envelopes that carry an [`ErrorDetail`]
pub async fn expose_error_detail(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer error body");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let mut json: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(json) => json,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    if let Some(object) = json.as_object_mut() {
        object.insert("stack".to_string(), serde_json::Value::String(detail));
    }

    match serde_json::to_vec(&json) {
        Ok(body) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(body))
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}
