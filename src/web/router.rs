//! Router configuration for the publish server.

use axum::{
    extract::State,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use super::snapshot::SnapshotSlot;
use crate::error::{FeedmergeError, Result};

#[derive(Clone)]
struct FeedState {
    slot: SnapshotSlot,
    content_type: HeaderValue,
}

/// Create the router serving the snapshot at `path`.
pub fn create_router(path: &str, content_type: &str, slot: SnapshotSlot) -> Result<Router> {
    let content_type = HeaderValue::from_str(content_type).map_err(|e| {
        FeedmergeError::Config(format!("invalid content type {content_type}: {e}"))
    })?;

    let feed_routes = Router::new()
        .route(path, get(serve_feed))
        .with_state(FeedState { slot, content_type });

    Ok(feed_routes
        .merge(create_health_router())
        .layer(TraceLayer::new_for_http()))
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

async fn serve_feed(State(state): State<FeedState>) -> Response {
    match state.slot.current().await {
        Some(snapshot) => {
            let body = snapshot.body().clone();
            (
                [
                    (CONTENT_TYPE, state.content_type.clone()),
                    (CONTENT_LENGTH, HeaderValue::from(body.len())),
                ],
                body,
            )
                .into_response()
        }
        None => (StatusCode::INTERNAL_SERVER_ERROR, "feed not available yet").into_response(),
    }
}
